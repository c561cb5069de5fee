//! Hierarchy builder.
//!
//! Turns classified buckets into a tree in four passes per bucket: wrap each
//! config in an item, move items into folders along their hierarchy path,
//! prune folders left empty, then attach the presets derived from every
//! profile.

use crate::catalog::CapabilityCatalog;
use crate::classify::{Buckets, ClassifierOptions, classify};
use crate::tree::{Folder, Item, ItemEntity, TreeNode};
use profilecloud_model::{
    BaseEntity, DerivedEntity, ElementConfig, EntityKind, MergedEntity, Payload, SyncState,
};
use profilecloud_types::{ApplicationId, RecordId};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Naming hint embedded in an element's init script: `--[[@sn]] self:gen("Name")`.
static PRESET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"--\[\[@sn\]\] self:gen\(["']([^"']+)["']\)"#).expect("valid preset name regex")
});

/// Id of the root folder.
pub const ROOT_ID: &str = "root";

/// Options of a tree build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub classifier: ClassifierOptions,
    /// Types of the hardware currently connected.
    pub compatibility_types: Vec<String>,
    /// Whether a search filter is active.
    pub searching: bool,
}

/// The top-level folders of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    Mine,
    Recommended,
    Community,
    Other,
    Unsupported,
}

impl BucketKind {
    /// Returns the folder id of the bucket.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Mine => "mine",
            Self::Recommended => "recommended",
            Self::Community => "community",
            Self::Other => "other",
            Self::Unsupported => "unsupported",
        }
    }

    /// Returns the folder title of the bucket.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Mine => "My Configs",
            Self::Recommended => "Recommended Configs",
            Self::Community => "Community Configs",
            Self::Other => "Other Configs",
            Self::Unsupported => "Unsupported Configs",
        }
    }
}

/// Returns the buckets a tree shows, in display order.
pub fn surfaced_buckets(options: &BuildOptions) -> Vec<BucketKind> {
    let mut kinds = vec![BucketKind::Mine];
    if options.searching || options.classifier.hide_community {
        kinds.push(BucketKind::Other);
    } else {
        kinds.push(BucketKind::Recommended);
        kinds.push(BucketKind::Community);
    }
    if options.classifier.supported_only {
        kinds.push(BucketKind::Unsupported);
    }
    kinds
}

/// Classifies `entities` and builds the tree.
pub fn build(
    entities: &[MergedEntity],
    options: &BuildOptions,
    catalog: &dyn CapabilityCatalog,
) -> Folder {
    let buckets = classify(entities, &options.classifier);
    build_from_buckets(buckets, options, catalog)
}

/// Builds the tree from already classified buckets.
pub fn build_from_buckets(
    mut buckets: Buckets,
    options: &BuildOptions,
    catalog: &dyn CapabilityCatalog,
) -> Folder {
    let mut root = Folder::new(ROOT_ID, "Root");
    for kind in surfaced_buckets(options) {
        let entities = match kind {
            BucketKind::Mine => std::mem::take(&mut buckets.mine),
            BucketKind::Recommended => std::mem::take(&mut buckets.recommended),
            BucketKind::Community => std::mem::take(&mut buckets.community),
            BucketKind::Other => std::mem::take(&mut buckets.other),
            BucketKind::Unsupported => std::mem::take(&mut buckets.unsupported),
        };

        let mut folder = Folder::new(kind.key(), kind.title());
        folder.children = entities
            .into_iter()
            .map(|entity| {
                let compatible =
                    is_compatible(&entity.base, &options.compatibility_types, catalog);
                TreeNode::Item(Item::new(ItemEntity::Merged(entity), compatible))
            })
            .collect();

        decompose_paths(&mut folder);
        prune_empty_folders(&mut folder);
        attach_derived_presets(&mut folder.children, &options.compatibility_types, catalog);
        debug!("built bucket {} with {} top-level nodes", kind.key(), folder.children.len());
        root.children.push(TreeNode::Folder(folder));
    }
    root
}

/// Moves every item with a hierarchy path out of `bucket` into nested
/// folders, creating them as needed.
///
/// Children are walked in reverse index order so that removal does not skip
/// anything; the moved items keep their relative order.
fn decompose_paths(bucket: &mut Folder) {
    let mut moved = Vec::new();
    for i in (0..bucket.children.len()).rev() {
        let TreeNode::Item(item) = &bucket.children[i] else {
            continue;
        };
        let segments = path_segments(item.entity.merged().hierarchy_path());
        if segments.is_empty() {
            continue;
        }
        let node = bucket.children.remove(i);
        moved.push((segments, node));
    }

    for (segments, node) in moved.into_iter().rev() {
        place(bucket, &segments, node);
    }
}

/// Splits a hierarchy path. Descent stops at the first empty segment.
fn path_segments(path: Option<&str>) -> Vec<String> {
    path.map(|p| {
        p.split('/')
            .take_while(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn place(folder: &mut Folder, segments: &[String], node: TreeNode) {
    let Some((first, rest)) = segments.split_first() else {
        folder.children.push(node);
        return;
    };

    let existing = folder
        .children
        .iter()
        .position(|child| matches!(child, TreeNode::Folder(f) if f.title == *first));
    let index = match existing {
        Some(index) => index,
        None => {
            let id = format!("{}/{}", folder.id, first);
            folder.children.push(TreeNode::Folder(Folder::new(id, first.as_str())));
            folder.children.len() - 1
        }
    };
    if let TreeNode::Folder(child) = &mut folder.children[index] {
        place(child, rest, node);
    }
}

/// Removes folders below `bucket` that end up with no children. The bucket
/// itself is kept even when empty.
fn prune_empty_folders(bucket: &mut Folder) {
    for child in &mut bucket.children {
        if let TreeNode::Folder(folder) = child {
            prune_empty_folders(folder);
        }
    }
    bucket
        .children
        .retain(|child| !matches!(child, TreeNode::Folder(f) if f.children.is_empty()));
}

fn attach_derived_presets(
    nodes: &mut [TreeNode],
    compatibility_types: &[String],
    catalog: &dyn CapabilityCatalog,
) {
    for node in nodes {
        match node {
            TreeNode::Folder(folder) => {
                attach_derived_presets(&mut folder.children, compatibility_types, catalog);
            }
            TreeNode::Item(item) => {
                let ItemEntity::Merged(parent) = &item.entity else {
                    continue;
                };
                if parent.kind() != EntityKind::Profile {
                    continue;
                }
                for derived in derive_presets(parent, catalog) {
                    let compatible =
                        is_compatible(&derived.entity.base, compatibility_types, catalog);
                    item.children.push(TreeNode::Item(Item::new(
                        ItemEntity::Derived(derived),
                        compatible,
                    )));
                }
            }
        }
    }
}

/// Synthesizes one read-only preset per profile element whose slot the
/// module defines. Elements of unknown modules or unassigned slots are
/// skipped.
pub fn derive_presets(profile: &MergedEntity, catalog: &dyn CapabilityCatalog) -> Vec<DerivedEntity> {
    let Payload::Profile(elements) = &profile.base.payload else {
        return Vec::new();
    };
    let Some(slots) = catalog.module_slots(&profile.base.semantic_type) else {
        debug!(
            "no slot list for module type {:?}; skipping presets of {}",
            profile.base.semantic_type, profile.application_id
        );
        return Vec::new();
    };

    elements
        .iter()
        .filter_map(|element| {
            let index = element.control_element_number;
            let slot_type = usize::try_from(index)
                .ok()
                .and_then(|i| slots.get(i).cloned().flatten())?;
            Some(derive_preset(profile, element, &slot_type))
        })
        .collect()
}

fn derive_preset(profile: &MergedEntity, element: &ElementConfig, slot_type: &str) -> DerivedEntity {
    let index = element.control_element_number;
    let name = preset_name(element)
        .unwrap_or_else(|| format!("Element {} ({})", index, capitalize(slot_type)));
    let application_id = ApplicationId::derived(&profile.application_id, index);

    let base = BaseEntity {
        id: RecordId::new(application_id.as_str()),
        name: name.clone(),
        description: String::new(),
        payload: Payload::Preset(element.clone()),
        modified_at: profile.base.modified_at,
        created_at: profile.base.created_at,
        semantic_type: slot_type.to_string(),
        version: None,
        hierarchy_path: None,
    };

    DerivedEntity {
        entity: MergedEntity {
            application_id,
            base,
            owner_id: None,
            editable: false,
            sync_state: SyncState::LocalOnly,
            is_public: None,
        },
        parent_id: profile.application_id.clone(),
        sub_index: index,
        display_name: format!("{} / {}", profile.base.name, name),
    }
}

/// Extracts the naming hint from an element's first init script.
fn preset_name(element: &ElementConfig) -> Option<String> {
    let script = element.init_script()?;
    PRESET_NAME
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns true when a config fits the requested types.
///
/// Snippets fit anything. Members of the substitutable module pair fit when
/// either member is requested. Profiles need their module type requested;
/// presets also fit when the catalog relates their element type to a
/// requested one in either direction.
pub fn is_compatible(
    base: &BaseEntity,
    requested: &[String],
    catalog: &dyn CapabilityCatalog,
) -> bool {
    let kind = base.kind();
    if kind == EntityKind::Snippet {
        return true;
    }

    let semantic_type = base.semantic_type.as_str();
    let substitutes = catalog.substitutable_modules();
    if substitutes.iter().any(|s| s == semantic_type) {
        return requested.iter().any(|t| substitutes.contains(t));
    }

    let direct = requested.iter().any(|t| t == semantic_type);
    match kind {
        EntityKind::Preset => {
            direct
                || requested.iter().any(|t| {
                    catalog.is_element_compatible(t, semantic_type)
                        || catalog.is_element_compatible(semantic_type, t)
                })
        }
        _ => direct,
    }
}
