//! Tree node types.
//!
//! A tree is a plain recursive value: folders own their children, items wrap
//! one merged or derived config. Builders return a new tree; nothing inside
//! it notifies anyone of changes.

use profilecloud_model::{BaseEntity, DerivedEntity, EntityKind, MergedEntity};
use profilecloud_types::Timestamp;
use serde::Serialize;

/// A node of the config tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum TreeNode {
    Folder(Folder),
    Item(Item),
}

impl TreeNode {
    /// Returns the node id: the folder id, or the item's application id.
    pub fn id(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.id,
            Self::Item(item) => item.entity.application_id(),
        }
    }

    /// Returns the name the node is sorted and displayed by.
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.title,
            Self::Item(item) => &item.entity.base().name,
        }
    }

    /// Returns the children of the node.
    pub fn children(&self) -> &[TreeNode] {
        match self {
            Self::Folder(folder) => &folder.children,
            Self::Item(item) => &item.children,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<TreeNode> {
        match self {
            Self::Folder(folder) => &mut folder.children,
            Self::Item(item) => &mut item.children,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(item) => Some(item),
            Self::Folder(_) => None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }
}

/// A folder: a bucket or a segment of a hierarchy path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder {
    /// Stable id: bucket key, then the path below it (`"mine/Studio/Mixing"`).
    pub id: String,
    pub title: String,
    pub children: Vec<TreeNode>,
}

impl Folder {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            children: Vec::new(),
        }
    }

    /// Returns the direct child folder titled `title`.
    pub fn folder(&self, title: &str) -> Option<&Folder> {
        self.children
            .iter()
            .filter_map(TreeNode::as_folder)
            .find(|f| f.title == title)
    }

    /// Returns the direct child items.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.children.iter().filter_map(TreeNode::as_item)
    }
}

/// An item: one config, plus the presets derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub entity: ItemEntity,
    /// Whether the config fits the requested hardware.
    pub compatible: bool,
    /// Set by filtering; hidden items stay in the tree.
    pub hidden: bool,
    /// Derived presets of a profile item.
    pub children: Vec<TreeNode>,
}

impl Item {
    pub fn new(entity: ItemEntity, compatible: bool) -> Self {
        Self {
            entity,
            compatible,
            hidden: false,
            children: Vec::new(),
        }
    }
}

/// The config wrapped by an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemEntity {
    Merged(MergedEntity),
    Derived(DerivedEntity),
}

impl ItemEntity {
    pub fn merged(&self) -> &MergedEntity {
        match self {
            Self::Merged(entity) => entity,
            Self::Derived(derived) => &derived.entity,
        }
    }

    pub fn base(&self) -> &BaseEntity {
        &self.merged().base
    }

    pub fn application_id(&self) -> &str {
        self.merged().application_id.as_str()
    }

    pub fn kind(&self) -> EntityKind {
        self.base().kind()
    }

    pub fn modified_at(&self) -> Timestamp {
        self.base().modified_at
    }

    /// Returns the derived-preset view, if this is one.
    pub fn derived(&self) -> Option<&DerivedEntity> {
        match self {
            Self::Derived(derived) => Some(derived),
            Self::Merged(_) => None,
        }
    }
}
