//! Category classifier.
//!
//! Each bucket is an independent predicate over the same merged list; an
//! entity may land in several buckets or none. The builder decides which
//! buckets to show.

use profilecloud_model::{MergedEntity, SyncState};
use profilecloud_types::PrincipalId;
use serde::{Deserialize, Serialize};

/// Inputs of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Semantic types the connected hardware supports.
    pub capability_filter: Vec<String>,
    /// Only surface configs whose semantic type is supported.
    pub supported_only: bool,
    /// Collapse recommended and community configs into "other". On by
    /// default.
    pub hide_community: bool,
    /// The signed-in principal, if any.
    pub principal_id: Option<PrincipalId>,
    /// Owners whose configs are recommended.
    pub curated_owner_ids: Vec<PrincipalId>,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            capability_filter: Vec::new(),
            supported_only: false,
            hide_community: true,
            principal_id: None,
            curated_owner_ids: Vec::new(),
        }
    }
}

impl ClassifierOptions {
    fn is_supported(&self, entity: &MergedEntity) -> bool {
        self.capability_filter
            .iter()
            .any(|t| *t == entity.base.semantic_type)
    }

    /// The supported-only gate shared by the non-personal buckets.
    fn passes_gate(&self, entity: &MergedEntity) -> bool {
        !self.supported_only || self.is_supported(entity)
    }

    fn is_mine(&self, entity: &MergedEntity) -> bool {
        entity.sync_state == SyncState::LocalOnly
            || (self.principal_id.is_some() && entity.owner_id == self.principal_id)
    }

    fn is_curated(&self, entity: &MergedEntity) -> bool {
        entity
            .owner_id
            .as_ref()
            .is_some_and(|owner| self.curated_owner_ids.contains(owner))
    }
}

/// The classified buckets, each in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub mine: Vec<MergedEntity>,
    pub recommended: Vec<MergedEntity>,
    pub community: Vec<MergedEntity>,
    pub other: Vec<MergedEntity>,
    pub unsupported: Vec<MergedEntity>,
}

/// Classifies merged entities into buckets.
#[must_use]
pub fn classify(entities: &[MergedEntity], options: &ClassifierOptions) -> Buckets {
    let mut buckets = Buckets::default();
    for entity in entities {
        let mine = options.is_mine(entity);
        let curated = options.is_curated(entity);
        let gate = options.passes_gate(entity);

        if mine {
            buckets.mine.push(entity.clone());
            continue;
        }
        if curated && gate {
            buckets.recommended.push(entity.clone());
        }
        if !curated && entity.is_public == Some(true) && gate {
            buckets.community.push(entity.clone());
        }
        if gate {
            buckets.other.push(entity.clone());
        }
        if options.supported_only && !options.is_supported(entity) {
            buckets.unsupported.push(entity.clone());
        }
    }
    buckets
}
