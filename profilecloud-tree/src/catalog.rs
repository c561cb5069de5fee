//! Capability catalog: what each module type offers.
//!
//! The catalog answers three questions for the tree: which element sits in
//! each slot of a module, which element types can stand in for each other,
//! and what a script action-block tag is called in the editor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slot index of the system element every module carries.
pub const SYSTEM_SLOT: usize = 255;

/// Lookup of module and element capabilities.
pub trait CapabilityCatalog {
    /// Returns the ordered slot list of a module type. `None` entries are
    /// unassigned slots. Returns `None` for unknown module types.
    fn module_slots(&self, module_type: &str) -> Option<Vec<Option<String>>>;

    /// Returns true when an element of type `from` can be used where `to` is
    /// expected. Not necessarily symmetric.
    fn is_element_compatible(&self, from: &str, to: &str) -> bool;

    /// Returns the human-readable name of an action-block tag.
    fn action_block_name(&self, tag: &str) -> Option<String>;

    /// Returns the module types that substitute for each other.
    fn substitutable_modules(&self) -> &[String];
}

/// Serializable description of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSpec {
    /// Module type to its slot list.
    pub modules: BTreeMap<String, Vec<Option<String>>>,
    /// Directed element compatibility pairs `(from, to)`. Every element type
    /// is compatible with itself.
    pub element_compatibility: Vec<(String, String)>,
    /// Module types that substitute for each other.
    pub substitutable_modules: Vec<String>,
    /// Action-block tag to display name.
    pub action_blocks: BTreeMap<String, String>,
}

impl Default for CatalogSpec {
    /// The grid module family.
    fn default() -> Self {
        let mut modules = BTreeMap::new();
        modules.insert("PO16".into(), slots(&[("potentiometer", 16)]));
        modules.insert("BU16".into(), slots(&[("button", 16)]));
        modules.insert(
            "PBF4".into(),
            slots(&[("potentiometer", 4), ("fader", 4), ("button", 4)]),
        );
        modules.insert("EN16".into(), slots(&[("encoder", 16)]));
        modules.insert("EF44".into(), slots(&[("encoder", 4), ("fader", 4)]));
        modules.insert("PB44".into(), slots(&[("potentiometer", 8), ("button", 8)]));
        modules.insert("TEK2".into(), slots(&[("button", 8), ("endless", 2)]));
        let vsn1 = slots(&[("button", 8), ("endless", 1), ("button", 4), ("lcd", 1)]);
        modules.insert("VSN1L".into(), vsn1.clone());
        modules.insert("VSN1R".into(), vsn1);

        let element_compatibility = [
            ("potentiometer", "fader"),
            ("fader", "potentiometer"),
            ("encoder", "endless"),
            ("endless", "encoder"),
            ("button", "encoder"),
            ("button", "endless"),
        ]
        .iter()
        .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
        .collect();

        let action_blocks = [
            ("sn", "Element Name"),
            ("cb", "Code Block"),
            ("glc", "Color"),
            ("glp", "Intensity"),
            ("gms", "MIDI"),
            ("gmsh", "MIDI 14bit"),
            ("gks", "Keyboard"),
            ("sbc", "Button Mode"),
            ("sec", "Encoder Mode"),
            ("spc", "Potentiometer Mode"),
            ("l", "Locals"),
            ("if", "If"),
            ("en", "End"),
            ("t", "Timer Start"),
            ("ts", "Timer Stop"),
        ]
        .iter()
        .map(|(tag, name)| ((*tag).to_string(), (*name).to_string()))
        .collect();

        Self {
            modules,
            element_compatibility,
            substitutable_modules: vec!["VSN1L".into(), "VSN1R".into()],
            action_blocks,
        }
    }
}

/// Lays out consecutive runs of element types from slot 0, then the system
/// element at [`SYSTEM_SLOT`].
fn slots(runs: &[(&str, usize)]) -> Vec<Option<String>> {
    let mut list: Vec<Option<String>> = runs
        .iter()
        .flat_map(|(kind, count)| std::iter::repeat_n(Some((*kind).to_string()), *count))
        .collect();
    list.resize(SYSTEM_SLOT, None);
    list.push(Some("system".to_string()));
    list
}

/// A catalog backed by a [`CatalogSpec`].
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    spec: CatalogSpec,
}

impl StaticCatalog {
    pub fn new(spec: CatalogSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CatalogSpec {
        &self.spec
    }
}

impl CapabilityCatalog for StaticCatalog {
    fn module_slots(&self, module_type: &str) -> Option<Vec<Option<String>>> {
        self.spec.modules.get(module_type).cloned()
    }

    fn is_element_compatible(&self, from: &str, to: &str) -> bool {
        from == to
            || self
                .spec
                .element_compatibility
                .iter()
                .any(|(a, b)| a == from && b == to)
    }

    fn action_block_name(&self, tag: &str) -> Option<String> {
        self.spec.action_blocks.get(tag).cloned()
    }

    fn substitutable_modules(&self) -> &[String] {
        &self.spec.substitutable_modules
    }
}

