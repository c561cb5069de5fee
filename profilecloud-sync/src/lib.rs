//! Config merge engine for ProfileCloud.
//!
//! Configs live in two places: as files on the local device and as documents
//! in a remote store. This crate maintains a single merged view of both.
//!
//! # Architecture
//!
//! - **Correlator**: maps local and remote record ids onto one application id
//! - **Resolve**: last-writer-wins choice between the two copies of a config
//! - **Engine**: owns the subscriptions, resynthesizes the merged list on every
//!   change and routes mutations to the right collaborator
//!
//! The engine talks to the outside through small traits:
//! [`RemoteStore`] and [`ShareLinkSource`] for the remote side,
//! [`PrincipalSource`] for the signed-in account, [`HostBridge`] for the
//! host application that owns local files. [`LocalSnapshotHub`] fans the
//! host's local snapshot out to every engine.
//!
//! # Example
//!
//! ```
//! use profilecloud_sync::{
//!     ChannelHostBridge, Collaborators, EngineConfig, LocalSnapshotHub, MemoryRemoteStore,
//!     MergeEngine, PrincipalCell,
//! };
//! use std::sync::Arc;
//!
//! let store = MemoryRemoteStore::new();
//! let (host, _requests) = ChannelHostBridge::new();
//! let collaborators = Collaborators {
//!     local: LocalSnapshotHub::new(),
//!     remote: Arc::new(store.clone()),
//!     principal: Arc::new(PrincipalCell::new(None)),
//!     share_links: Arc::new(store),
//!     host: Arc::new(host),
//! };
//!
//! let engine = MergeEngine::start(EngineConfig::default(), collaborators, Arc::new(|_| {}));
//! assert!(engine.current().is_empty());
//! ```

mod correlator;
mod engine;
mod error;
pub mod host;
mod local;
mod principal;
pub mod remote;
mod resolve;
mod subscription;

pub use correlator::{IdentityCorrelator, RecordGroup};
pub use engine::{Collaborators, EngineConfig, MergeEngine, MergedListener};
pub use error::{SyncError, SyncResult};
pub use host::{
    AnalyticsEvent, ChannelHostBridge, HostBridge, HostOperation, HostReply, HostRequest,
    HostRequestReceiver, ImportConfigRequest, LogLevel, LogMessage,
};
pub use local::{LocalSnapshot, LocalSnapshotHub};
pub use principal::{PrincipalCell, PrincipalSource};
pub use remote::{MemoryRemoteStore, RemoteQuery, RemoteStore, ShareLinkSource};
pub use resolve::resolve;
pub use subscription::{Callback, Subscription};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
