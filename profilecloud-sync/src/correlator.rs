//! Identity correlation between local and remote records.
//!
//! Each source has its own storage ids. The correlator maps both onto one
//! stable [`ApplicationId`] per logical config, so that a config keeps its
//! identity when a local file later acquires a remote counterpart (or the
//! other way around).
//!
//! Correlation runs in passes: register every record currently held by
//! either source, then [`IdentityCorrelator::reconcile`]. Record ids not seen
//! during a pass are forgotten, and an application id with neither copy left
//! disappears with them.

use profilecloud_model::{LocalRecord, RemoteRecord};
use profilecloud_types::{ApplicationId, RecordId};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// The copies of one logical config, at most one per source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordGroup {
    pub local: Option<LocalRecord>,
    pub remote: Option<RemoteRecord>,
}

impl RecordGroup {
    /// Returns true when neither source holds a copy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_none() && self.remote.is_none()
    }
}

/// Maps per-source record ids onto stable application ids.
#[derive(Debug, Default)]
pub struct IdentityCorrelator {
    /// Record id (local or remote) to the application id it belongs to.
    record_to_app: HashMap<RecordId, ApplicationId>,
    /// Groups resolved by the last reconcile.
    groups: BTreeMap<ApplicationId, RecordGroup>,
    /// Groups being filled by the current pass.
    pending: BTreeMap<ApplicationId, RecordGroup>,
    /// Record ids registered (or referenced) during the current pass.
    seen: HashSet<RecordId>,
}

impl IdentityCorrelator {
    /// Creates an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a local record for the current pass.
    ///
    /// A record seen for the first time takes the application id of the
    /// remote record it references, or its own storage id when it references
    /// none. A referenced remote id is pulled into the same application id.
    pub fn register_local(&mut self, record: LocalRecord) -> ApplicationId {
        let id = record.id().clone();
        self.seen.insert(id.clone());

        let app_id = match self.record_to_app.get(&id) {
            Some(app_id) => app_id.clone(),
            None => {
                let app_id = match &record.remote_id {
                    Some(remote_id) => self
                        .record_to_app
                        .get(remote_id)
                        .cloned()
                        .unwrap_or_else(|| ApplicationId::from(remote_id)),
                    None => ApplicationId::from(&id),
                };
                self.record_to_app.insert(id, app_id.clone());
                app_id
            }
        };

        if let Some(remote_id) = &record.remote_id {
            self.seen.insert(remote_id.clone());
            self.record_to_app.insert(remote_id.clone(), app_id.clone());
        }

        let group = self.pending.entry(app_id.clone()).or_default();
        if let Some(previous) = &group.local {
            debug!(
                "local records {} and {} share application id {}",
                previous.id(),
                record.id(),
                app_id
            );
        }
        group.local = Some(record);
        app_id
    }

    /// Registers a remote record for the current pass.
    ///
    /// Joins the group of a local record that already claimed it as a
    /// counterpart, otherwise defaults to its own storage id.
    pub fn register_remote(&mut self, record: RemoteRecord) -> ApplicationId {
        let id = record.id().clone();
        self.seen.insert(id.clone());

        let app_id = self
            .record_to_app
            .entry(id.clone())
            .or_insert_with(|| ApplicationId::from(&id))
            .clone();

        self.pending.entry(app_id.clone()).or_default().remote = Some(record);
        app_id
    }

    /// Ends the current pass.
    ///
    /// Forgets record ids that were not registered during the pass and drops
    /// application ids backed by neither source. Returns the resolved groups.
    pub fn reconcile(&mut self) -> &BTreeMap<ApplicationId, RecordGroup> {
        let seen = std::mem::take(&mut self.seen);
        let before = self.record_to_app.len();
        self.record_to_app.retain(|id, _| seen.contains(id));
        let dropped = before - self.record_to_app.len();
        if dropped > 0 {
            debug!("forgot {} record ids no longer present in either source", dropped);
        }

        let mut groups = std::mem::take(&mut self.pending);
        groups.retain(|_, group| !group.is_empty());
        self.groups = groups;
        &self.groups
    }

    /// Returns the groups resolved by the last reconcile.
    pub fn groups(&self) -> &BTreeMap<ApplicationId, RecordGroup> {
        &self.groups
    }

    /// Returns the group resolved for `app_id` by the last reconcile.
    pub fn group(&self, app_id: &ApplicationId) -> Option<&RecordGroup> {
        self.groups.get(app_id)
    }

    /// Returns the application id a record id currently maps to.
    pub fn application_id_of(&self, record_id: &RecordId) -> Option<&ApplicationId> {
        self.record_to_app.get(record_id)
    }

    /// Drops an application id and every record id mapped onto it.
    pub fn forget(&mut self, app_id: &ApplicationId) -> Option<RecordGroup> {
        self.record_to_app.retain(|_, mapped| mapped != app_id);
        self.pending.remove(app_id);
        self.groups.remove(app_id)
    }
}
