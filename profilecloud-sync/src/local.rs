//! Fan-out of the local config snapshot.
//!
//! The host application pushes the complete set of local records whenever it
//! changes. [`LocalSnapshotHub`] keeps the latest snapshot and forwards every
//! push to each registered listener, so several merge engines can observe the
//! same device. Construct one per process and hand clones to each engine.

use crate::lock;
use crate::subscription::{Callback, Subscription};
use profilecloud_model::LocalRecord;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Shared snapshot passed to listeners.
pub type LocalSnapshot = Arc<Vec<LocalRecord>>;

/// Owns the latest local snapshot and the listeners waiting for the next one.
#[derive(Clone, Default)]
pub struct LocalSnapshotHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    latest: LocalSnapshot,
    listeners: BTreeMap<u64, Callback<LocalSnapshot>>,
    next_id: u64,
}

impl LocalSnapshotHub {
    /// Creates a hub holding an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot and notifies every listener.
    ///
    /// Always pass the complete set; there is no diffing.
    pub fn publish(&self, records: Vec<LocalRecord>) {
        let snapshot: LocalSnapshot = Arc::new(records);
        let listeners: Vec<_> = {
            let mut inner = lock(&self.inner);
            inner.latest = snapshot.clone();
            inner.listeners.values().cloned().collect()
        };
        debug!(
            "publishing {} local records to {} listeners",
            snapshot.len(),
            listeners.len()
        );
        for listener in listeners {
            listener(snapshot.clone());
        }
    }

    /// Returns the most recently published snapshot.
    pub fn latest(&self) -> LocalSnapshot {
        lock(&self.inner).latest.clone()
    }

    /// Registers a listener for future publishes.
    pub fn subscribe(&self, listener: Callback<LocalSnapshot>) -> Subscription {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener);
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        })
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}
