//! Remote document store boundary.
//!
//! The store is queried live: a subscription delivers the full set of
//! documents matching a [`RemoteQuery`] every time any of them changes.
//! Documents are delivered raw so that the merge engine, not the store,
//! decides which ones are readable.

use crate::error::{SyncError, SyncResult};
use crate::lock;
use crate::subscription::{Callback, Subscription};
use async_trait::async_trait;
use profilecloud_model::RemoteRecord;
use profilecloud_types::{PrincipalId, RecordId};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Live query for the remote records visible to a principal:
/// `public == true OR access contains principal`. Without a principal only
/// public records are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteQuery {
    pub principal: Option<PrincipalId>,
}

impl RemoteQuery {
    /// Builds the query for `principal`.
    pub fn for_principal(principal: Option<PrincipalId>) -> Self {
        Self { principal }
    }

    /// Evaluates the query against a typed record.
    pub fn matches(&self, record: &RemoteRecord) -> bool {
        record.is_public || record.grants_access(self.principal.as_ref())
    }

    /// Evaluates the query against a raw document.
    pub fn matches_document(&self, document: &Value) -> bool {
        if document.get("public").and_then(Value::as_bool) == Some(true) {
            return true;
        }
        let Some(principal) = &self.principal else {
            return false;
        };
        document
            .get("access")
            .and_then(Value::as_array)
            .is_some_and(|access| {
                access
                    .iter()
                    .any(|entry| entry.as_str() == Some(principal.as_str()))
            })
    }
}

/// A remote document store with live queries.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Allocates an id for a document that does not exist yet.
    fn new_document_id(&self) -> RecordId;

    /// Starts a live query. `listener` receives the complete matching set on
    /// every change until the subscription is disposed.
    fn subscribe(&self, query: RemoteQuery, listener: Callback<Vec<Value>>) -> Subscription;

    /// Creates or replaces a document.
    async fn upsert(&self, record: &RemoteRecord) -> SyncResult<()>;

    /// Changes only the `public` flag of a document.
    async fn set_visibility(&self, id: &RecordId, is_public: bool) -> SyncResult<()>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete(&self, id: &RecordId) -> SyncResult<()>;
}

/// Resolves share-link ids to remote-record-shaped documents.
#[async_trait]
pub trait ShareLinkSource: Send + Sync {
    async fn fetch_share_link(&self, link_id: &str) -> SyncResult<Value>;
}

/// An in-memory remote store that emits synchronously on every write.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    documents: Mutex<BTreeMap<RecordId, Value>>,
    share_links: Mutex<HashMap<String, Value>>,
    subscribers: Mutex<BTreeMap<u64, (RemoteQuery, Callback<Vec<Value>>)>>,
    next_subscriber: Mutex<u64>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw document without validation and notifies subscribers.
    ///
    /// Documents without a string `id` are ignored.
    pub fn insert_document(&self, document: Value) {
        let Some(id) = document.get("id").and_then(Value::as_str).map(RecordId::from) else {
            return;
        };
        lock(&self.inner.documents).insert(id, document);
        self.notify();
    }

    /// Registers a share-link document.
    pub fn insert_share_link(&self, link_id: impl Into<String>, document: Value) {
        lock(&self.inner.share_links).insert(link_id.into(), document);
    }

    /// Returns a stored document.
    pub fn document(&self, id: &RecordId) -> Option<Value> {
        lock(&self.inner.documents).get(id).cloned()
    }

    /// Returns the number of stored documents.
    pub fn len(&self) -> usize {
        lock(&self.inner.documents).len()
    }

    /// Returns true if no documents are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Makes every subsequent write fail, simulating a lost connection.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Remote("store is offline".into()));
        }
        Ok(())
    }

    fn snapshot_for(&self, query: &RemoteQuery) -> Vec<Value> {
        lock(&self.inner.documents)
            .values()
            .filter(|doc| query.matches_document(doc))
            .cloned()
            .collect()
    }

    fn notify(&self) {
        let subscribers: Vec<_> = lock(&self.inner.subscribers).values().cloned().collect();
        for (query, listener) in subscribers {
            let snapshot = self.snapshot_for(&query);
            listener(snapshot);
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn new_document_id(&self) -> RecordId {
        RecordId::generate()
    }

    fn subscribe(&self, query: RemoteQuery, listener: Callback<Vec<Value>>) -> Subscription {
        let id = {
            let mut next = lock(&self.inner.next_subscriber);
            let id = *next;
            *next += 1;
            id
        };
        lock(&self.inner.subscribers).insert(id, (query.clone(), listener.clone()));
        debug!("remote subscription {} opened for {:?}", id, query.principal);
        listener(self.snapshot_for(&query));

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.subscribers).remove(&id);
                debug!("remote subscription {} closed", id);
            }
        })
    }

    async fn upsert(&self, record: &RemoteRecord) -> SyncResult<()> {
        self.check_online()?;
        let document = serde_json::to_value(record)?;
        lock(&self.inner.documents).insert(record.id().clone(), document);
        self.notify();
        Ok(())
    }

    async fn set_visibility(&self, id: &RecordId, is_public: bool) -> SyncResult<()> {
        self.check_online()?;
        {
            let mut documents = lock(&self.inner.documents);
            let document = documents
                .get_mut(id)
                .ok_or_else(|| SyncError::NotFound(format!("remote record {id}")))?;
            if let Some(fields) = document.as_object_mut() {
                fields.insert("public".into(), Value::Bool(is_public));
            }
        }
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> SyncResult<()> {
        self.check_online()?;
        let removed = lock(&self.inner.documents).remove(id).is_some();
        if removed {
            self.notify();
        }
        Ok(())
    }
}

#[async_trait]
impl ShareLinkSource for MemoryRemoteStore {
    async fn fetch_share_link(&self, link_id: &str) -> SyncResult<Value> {
        self.check_online()?;
        lock(&self.inner.share_links)
            .get(link_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("share link {link_id}")))
    }
}
