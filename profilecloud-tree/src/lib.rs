//! Config hierarchy for ProfileCloud.
//!
//! Projects the merge engine's flat list into a tree:
//!
//! 1. [`classify`] sorts configs into buckets (mine, recommended, community,
//!    other, unsupported)
//! 2. [`build`] turns the surfaced buckets into folders, decomposes each
//!    config's hierarchy path into nested folders and attaches the presets
//!    derived from every profile
//! 3. [`sort`] and [`filter`] reorder and hide items in place
//!
//! All of it is pure: a tree is rebuilt from scratch for every input and
//! never edited by anything but these functions.
//!
//! # Example
//!
//! ```
//! use profilecloud_tree::{BuildOptions, SortKey, StaticCatalog, build, sort};
//!
//! let catalog = StaticCatalog::default();
//! let mut tree = build(&[], &BuildOptions::default(), &catalog);
//! sort(&mut tree, SortKey::default());
//! // My Configs and Other Configs: shared configs are collapsed by default.
//! assert_eq!(tree.children.len(), 2);
//! ```

mod build;
mod catalog;
mod classify;
mod query;
mod tree;

pub use build::{
    BucketKind, BuildOptions, ROOT_ID, build, build_from_buckets, derive_presets, is_compatible,
    surfaced_buckets,
};
pub use catalog::{CapabilityCatalog, CatalogSpec, SYSTEM_SLOT, StaticCatalog};
pub use classify::{Buckets, ClassifierOptions, classify};
pub use query::{
    ACTION_BLOCK_MARKER, SortDirection, SortField, SortKey, Term, action_block_names,
    ancestors_of, filter, natural_cmp, sort, terms_from_query, visible_items,
};
pub use tree::{Folder, Item, ItemEntity, TreeNode};
