//! Query layer: in-place sorting and filtering of a built tree, plus lookups.

use crate::catalog::CapabilityCatalog;
use crate::tree::{Folder, Item, TreeNode};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::LazyLock;

/// Action-block tag in a script: `--[[@tag]]`.
static ACTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--\[\[@([A-Za-z0-9_]+)\]\]").expect("valid action tag regex"));

/// Prefix of a search term that matches action-block names.
pub const ACTION_BLOCK_MARKER: char = '$';

/// What items are ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    #[default]
    Date,
    Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort order of a tree. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Sorts every level of the tree.
///
/// Folders come first, ordered by title regardless of `key`; items follow,
/// ordered by `key`.
pub fn sort(folder: &mut Folder, key: SortKey) {
    sort_children(&mut folder.children, key);
}

fn sort_children(children: &mut Vec<TreeNode>, key: SortKey) {
    let (mut folders, mut items): (Vec<TreeNode>, Vec<TreeNode>) =
        std::mem::take(children).into_iter().partition(TreeNode::is_folder);

    folders.sort_by(|a, b| natural_cmp(a.name(), b.name()));
    items.sort_by(|a, b| compare_items(a, b, key.field));
    if key.direction == SortDirection::Desc {
        items.reverse();
    }

    children.extend(folders);
    children.extend(items);
    for child in children.iter_mut() {
        sort_children(child.children_mut(), key);
    }
}

fn compare_items(a: &TreeNode, b: &TreeNode, field: SortField) -> Ordering {
    let (Some(a), Some(b)) = (a.as_item(), b.as_item()) else {
        return Ordering::Equal;
    };
    match field {
        SortField::Name => natural_cmp(&a.entity.base().name, &b.entity.base().name),
        SortField::Type => natural_cmp(
            &a.entity.base().semantic_type,
            &b.entity.base().semantic_type,
        ),
        SortField::Date => a.entity.modified_at().cmp(&b.entity.modified_at()),
    }
}

/// Case-insensitive comparison that orders digit runs by numeric value
/// (`"Bank 2"` before `"Bank 10"`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a);
                let right = take_digits(&mut b);
                let ordering = compare_digit_runs(&left, &right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// One search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub value: String,
    /// The whole field must equal the term.
    pub whole_match: bool,
    /// Compare case-sensitively.
    pub case_match: bool,
}

/// Splits a search query on whitespace into ordered terms sharing the same flags.
pub fn terms_from_query(query: &str, whole_match: bool, case_match: bool) -> Vec<Term> {
    query
        .split_whitespace()
        .map(|part| Term {
            value: part.to_string(),
            whole_match,
            case_match,
        })
        .collect()
}

impl Term {
    fn matches_field(&self, field: &str) -> bool {
        let (field, value) = if self.case_match {
            (field.to_string(), self.value.clone())
        } else {
            (field.to_lowercase(), self.value.to_lowercase())
        };
        if self.whole_match {
            field == value
        } else {
            field.contains(&value)
        }
    }

    fn matches_item(&self, item: &Item, catalog: &dyn CapabilityCatalog) -> bool {
        if let Some(needle) = self.value.strip_prefix(ACTION_BLOCK_MARKER) {
            let needle = needle.to_lowercase();
            return action_block_names(item, catalog)
                .iter()
                .any(|name| name.to_lowercase().contains(&needle));
        }

        let base = item.entity.base();
        let mut fields = vec![
            base.name.as_str(),
            base.semantic_type.as_str(),
            base.kind().as_str(),
        ];
        if let Some(path) = base.hierarchy_path.as_deref() {
            fields.push(path);
        }
        fields.iter().any(|field| self.matches_field(field))
    }
}

/// Returns the display names of the action blocks tagged in an item's
/// scripts. Tags the catalog does not know are reported by tag.
pub fn action_block_names(item: &Item, catalog: &dyn CapabilityCatalog) -> Vec<String> {
    let mut names = Vec::new();
    for script in item.entity.base().payload.script_fragments() {
        for caps in ACTION_TAG.captures_iter(script) {
            let Some(tag) = caps.get(1) else { continue };
            let name = catalog
                .action_block_name(tag.as_str())
                .unwrap_or_else(|| tag.as_str().to_string());
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Hides items that fail any term; a term is met when any searchable field
/// matches it. Folders are never hidden. With no terms the tree is left
/// untouched.
pub fn filter(folder: &mut Folder, terms: &[Term], catalog: &dyn CapabilityCatalog) {
    if terms.is_empty() {
        return;
    }
    filter_children(&mut folder.children, terms, catalog);
}

fn filter_children(children: &mut [TreeNode], terms: &[Term], catalog: &dyn CapabilityCatalog) {
    for child in children {
        if let TreeNode::Item(item) = child {
            item.hidden = !terms.iter().all(|term| term.matches_item(item, catalog));
        }
        filter_children(child.children_mut(), terms, catalog);
    }
}

/// Returns the ids of the nodes enclosing the node `id`, outermost first.
/// Empty when `id` is not in the tree.
pub fn ancestors_of(root: &Folder, id: &str) -> Vec<String> {
    let mut path = Vec::new();
    if find_path(&root.children, id, &mut path) {
        let mut ancestors = vec![root.id.clone()];
        ancestors.extend(path);
        ancestors
    } else {
        Vec::new()
    }
}

fn find_path(children: &[TreeNode], id: &str, path: &mut Vec<String>) -> bool {
    for child in children {
        if child.id() == id {
            return true;
        }
        path.push(child.id().to_string());
        if find_path(child.children(), id, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Counts the items in a tree that are not hidden.
pub fn visible_items(folder: &Folder) -> usize {
    fn count(nodes: &[TreeNode]) -> usize {
        nodes
            .iter()
            .map(|node| match node {
                TreeNode::Item(item) if !item.hidden => 1 + count(&item.children),
                TreeNode::Item(_) => 0,
                TreeNode::Folder(folder) => count(&folder.children),
            })
            .sum()
    }
    count(&folder.children)
}
