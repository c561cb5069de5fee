//! Merge engine: reconciles local and remote configs into one list.
//!
//! The engine owns an [`IdentityCorrelator`] and the latest snapshot from each
//! source. Every local push or remote subscription event triggers a full
//! resynthesis of the merged list, which is handed to the observer. Runs are
//! total and idempotent, so a stale resynthesis racing a newer one is
//! harmless.
//!
//! Mutations (`save`, `delete`, `set_visibility`, `clone_from_share_link`)
//! write through the collaborators and never edit the merged list directly:
//! their effect shows up once the affected source re-emits. The exception is
//! `delete`, which drops the entry immediately.

use crate::correlator::IdentityCorrelator;
use crate::error::{SyncError, SyncResult};
use crate::host::{HostBridge, ImportConfigRequest, LogMessage};
use crate::local::{LocalSnapshot, LocalSnapshotHub};
use crate::lock;
use crate::principal::PrincipalSource;
use crate::remote::{RemoteQuery, RemoteStore, ShareLinkSource};
use crate::resolve::resolve;
use crate::subscription::{Callback, Subscription};
use profilecloud_model::{LocalRecord, MergedEntity, RemoteRecord, parse_snapshot};
use profilecloud_types::{ApplicationId, PrincipalId, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info, warn};

/// Configuration for the merge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix prepended to the name of a config cloned from a share link.
    pub copy_prefix: String,
    /// Whether failed mutations are reported to the user through the host.
    pub notify_failures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            copy_prefix: "Copy of ".to_string(),
            notify_failures: true,
        }
    }
}

/// The collaborators an engine reads from and writes through.
#[derive(Clone)]
pub struct Collaborators {
    pub local: LocalSnapshotHub,
    pub remote: Arc<dyn RemoteStore>,
    pub principal: Arc<dyn PrincipalSource>,
    pub share_links: Arc<dyn ShareLinkSource>,
    pub host: Arc<dyn HostBridge>,
}

/// Receives the complete merged list after every resynthesis.
pub type MergedListener = Callback<Vec<MergedEntity>>;

/// The merge engine.
pub struct MergeEngine {
    shared: Arc<Shared>,
}

struct Shared {
    config: EngineConfig,
    remote: Arc<dyn RemoteStore>,
    share_links: Arc<dyn ShareLinkSource>,
    host: Arc<dyn HostBridge>,
    observer: MergedListener,
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    correlator: IdentityCorrelator,
    local: Vec<LocalRecord>,
    remote: Vec<RemoteRecord>,
    principal: Option<PrincipalId>,
    /// Bumped on every resubscription; events from older subscriptions are ignored.
    remote_generation: u64,
    remote_subscription: Option<Subscription>,
    principal_subscription: Option<Subscription>,
    local_subscription: Option<Subscription>,
    merged: Vec<MergedEntity>,
    cancelled: bool,
}

impl EngineState {
    fn resynthesize(&mut self) -> Vec<MergedEntity> {
        for record in &self.local {
            self.correlator.register_local(record.clone());
        }
        for record in &self.remote {
            self.correlator.register_remote(record.clone());
        }
        let principal = self.principal.as_ref();
        self.merged = self
            .correlator
            .reconcile()
            .iter()
            .filter_map(|(app_id, group)| resolve(app_id, group, principal))
            .collect();
        self.merged.clone()
    }
}

impl MergeEngine {
    /// Starts an engine: seeds it with the hub's latest local snapshot, then
    /// subscribes to local pushes and to the principal (which in turn opens
    /// the remote subscription).
    pub fn start(
        config: EngineConfig,
        collaborators: Collaborators,
        observer: MergedListener,
    ) -> Self {
        let shared = Arc::new(Shared {
            config,
            remote: collaborators.remote,
            share_links: collaborators.share_links,
            host: collaborators.host,
            observer,
            state: Mutex::new(EngineState {
                local: collaborators.local.latest().as_ref().clone(),
                ..EngineState::default()
            }),
        });

        let weak = Arc::downgrade(&shared);
        let local_subscription =
            collaborators
                .local
                .subscribe(Arc::new(move |snapshot: LocalSnapshot| {
                    if let Some(shared) = weak.upgrade() {
                        shared.ingest_local(snapshot.as_ref().clone());
                    }
                }));

        let weak = Arc::downgrade(&shared);
        let principal_subscription =
            collaborators
                .principal
                .subscribe(Arc::new(move |principal: Option<PrincipalId>| {
                    if let Some(shared) = weak.upgrade() {
                        Shared::principal_changed(&shared, principal);
                    }
                }));

        {
            let mut state = lock(&shared.state);
            state.local_subscription = Some(local_subscription);
            state.principal_subscription = Some(principal_subscription);
        }

        Self { shared }
    }

    /// Replaces the local snapshot and resynthesizes.
    ///
    /// Always pass the complete set of local records.
    pub fn ingest_local_snapshot(&self, records: Vec<LocalRecord>) {
        self.shared.ingest_local(records);
    }

    /// Returns the most recently synthesized merged list.
    pub fn current(&self) -> Vec<MergedEntity> {
        lock(&self.shared.state).merged.clone()
    }

    /// Returns the active principal, if signed in.
    pub fn current_owner(&self) -> Option<PrincipalId> {
        lock(&self.shared.state).principal.clone()
    }

    /// Returns true once [`MergeEngine::cancel`] has run.
    pub fn is_cancelled(&self) -> bool {
        lock(&self.shared.state).cancelled
    }

    /// Tears down every subscription. Events and mutation completions that
    /// arrive afterwards leave the engine untouched.
    pub fn cancel(&self) {
        let subscriptions = {
            let mut state = lock(&self.shared.state);
            state.cancelled = true;
            [
                state.remote_subscription.take(),
                state.principal_subscription.take(),
                state.local_subscription.take(),
            ]
        };
        for subscription in subscriptions.into_iter().flatten() {
            subscription.dispose();
        }
        info!("merge engine cancelled");
    }

    /// Saves a config, stamping `modified_at` with the current time.
    ///
    /// With an active principal, the remote copy is upserted when creation is
    /// allowed or a remote copy already exists. The host is asked to write
    /// the local copy when creation is allowed or a local copy already
    /// exists; the request carries the remote id so the next local snapshot
    /// already references it.
    pub async fn save(&self, entity: MergedEntity, allow_create: bool) -> SyncResult<()> {
        let result = self.save_inner(entity, allow_create).await;
        self.surface("save config", result).await
    }

    async fn save_inner(&self, mut entity: MergedEntity, allow_create: bool) -> SyncResult<()> {
        entity.base.modified_at = Timestamp::now();

        let plan = {
            let mut state = lock(&self.shared.state);
            if state.cancelled {
                return Ok(());
            }
            let group = state
                .correlator
                .group(&entity.application_id)
                .cloned()
                .unwrap_or_default();
            let principal = state.principal.clone();

            let mut remote_record = None;
            if let Some(principal) = &principal {
                if allow_create || group.remote.is_some() {
                    if let Some(existing) = &group.remote {
                        if !existing.grants_access(Some(principal)) {
                            return Err(SyncError::Unauthorized(format!(
                                "{} may not modify remote record {}",
                                principal,
                                existing.id()
                            )));
                        }
                    }
                    // A config known to neither source takes its application
                    // id as remote id, so the echo keeps its identity.
                    let remote_id = match (&group.remote, &group.local) {
                        (Some(existing), _) => existing.id().clone(),
                        (None, None) => RecordId::new(entity.application_id.as_str()),
                        (None, Some(_)) => self.shared.remote.new_document_id(),
                    };

                    let mut base = entity.base.clone();
                    base.id = remote_id.clone();
                    remote_record = Some(RemoteRecord {
                        base,
                        owner_id: Some(principal.clone()),
                        access_list: vec![principal.clone()],
                        is_public: group.remote.as_ref().is_some_and(|r| r.is_public),
                    });

                    // Record the cross-reference now so the remote echo joins
                    // the existing local entry instead of showing up twice.
                    if let Some(local) = &group.local {
                        if let Some(cached) =
                            state.local.iter_mut().find(|l| l.id() == local.id())
                        {
                            cached.remote_id = Some(remote_id);
                        }
                    }
                }
            }

            SavePlan {
                remote_id: remote_record
                    .as_ref()
                    .map(|r| r.id().clone())
                    .or_else(|| group.remote.as_ref().map(|r| r.id().clone())),
                remote_record,
                remote_existed: group.remote.is_some(),
                local: group.local,
                principal,
            }
        };

        if let Some(record) = &plan.remote_record {
            debug!("upserting remote record {}", record.id());
            if let Err(e) = self.shared.remote.upsert(record).await {
                if !plan.remote_existed {
                    self.unlink_local(record.id());
                }
                return Err(e);
            }
        }

        if allow_create || plan.local.is_some() {
            let local_id = plan
                .local
                .as_ref()
                .map(|l| l.id().clone())
                .unwrap_or_else(|| entity.base.id.clone());
            let request = ImportConfigRequest {
                entity: entity.base,
                local_id,
                remote_id: plan.remote_id,
                file_name: plan.local.as_ref().map(|l| l.source_file_name.clone()),
                owner_id: plan.principal,
            };
            self.shared.host.import_config(&request).await?;
        }

        Ok(())
    }

    /// Drops a cross-reference recorded for a remote write that failed.
    fn unlink_local(&self, remote_id: &RecordId) {
        let mut state = lock(&self.shared.state);
        for record in state.local.iter_mut() {
            if record.remote_id.as_ref() == Some(remote_id) {
                record.remote_id = None;
            }
        }
    }

    /// Deletes both copies of a config and drops its entry immediately.
    ///
    /// A remote copy the principal may not modify is left in place; if it is
    /// the only copy the call fails with `Unauthorized`.
    pub async fn delete(&self, entity: &MergedEntity) -> SyncResult<()> {
        let result = self.delete_inner(&entity.application_id).await;
        self.surface("delete config", result).await
    }

    async fn delete_inner(&self, app_id: &ApplicationId) -> SyncResult<()> {
        let (group, principal) = {
            let state = lock(&self.shared.state);
            if state.cancelled {
                return Ok(());
            }
            match state.correlator.group(app_id) {
                Some(group) => (group.clone(), state.principal.clone()),
                None => return Ok(()),
            }
        };

        let remote_deletable = group
            .remote
            .as_ref()
            .is_some_and(|r| r.grants_access(principal.as_ref()));
        if let Some(remote) = &group.remote {
            if !remote_deletable && group.local.is_none() {
                return Err(SyncError::Unauthorized(format!(
                    "remote record {} is not owned by the current principal",
                    remote.id()
                )));
            }
        }

        if let Some(local) = &group.local {
            self.shared.host.delete_local_config(local).await?;
        }
        let mut deleted_remote: Option<RecordId> = None;
        if let Some(remote) = &group.remote {
            if remote_deletable {
                self.shared.remote.delete(remote.id()).await?;
                deleted_remote = Some(remote.id().clone());
            } else {
                warn!("keeping remote record {}: not accessible", remote.id());
            }
        }

        let merged = {
            let mut state = lock(&self.shared.state);
            if state.cancelled {
                return Ok(());
            }
            state.correlator.forget(app_id);
            if let Some(local) = &group.local {
                state.local.retain(|l| l.id() != local.id());
            }
            if let Some(remote_id) = &deleted_remote {
                state.remote.retain(|r| r.id() != remote_id);
            }
            state.resynthesize()
        };
        info!("deleted config {}", app_id);
        (self.shared.observer)(merged);
        Ok(())
    }

    /// Changes whether the remote copy of a config is public.
    ///
    /// Fails with `NotFound` when the config has no remote copy.
    pub async fn set_visibility(&self, entity: &MergedEntity, is_public: bool) -> SyncResult<()> {
        let result = self.set_visibility_inner(&entity.application_id, is_public).await;
        self.surface("change visibility", result).await
    }

    async fn set_visibility_inner(&self, app_id: &ApplicationId, is_public: bool) -> SyncResult<()> {
        let remote_id = {
            let state = lock(&self.shared.state);
            if state.cancelled {
                return Ok(());
            }
            let remote = state
                .correlator
                .group(app_id)
                .and_then(|g| g.remote.as_ref())
                .ok_or_else(|| SyncError::NotFound(format!("no remote copy of {app_id}")))?;
            if !remote.grants_access(state.principal.as_ref()) {
                return Err(SyncError::Unauthorized(format!(
                    "remote record {} is not owned by the current principal",
                    remote.id()
                )));
            }
            remote.id().clone()
        };
        self.shared.remote.set_visibility(&remote_id, is_public).await
    }

    /// Clones the config behind a share link into a new config of the
    /// current user.
    ///
    /// The copy is renamed with the configured prefix, loses its owner, gets
    /// a fresh application id and is saved with creation allowed. Returns
    /// `Ok(None)` when the link cannot be fetched; that failure is reported,
    /// not returned.
    pub async fn clone_from_share_link(&self, link_id: &str) -> SyncResult<Option<MergedEntity>> {
        let document = match self.shared.share_links.fetch_share_link(link_id).await {
            Ok(document) => document,
            Err(e) => {
                let _ = self.surface::<()>("fetch share link", Err(e)).await;
                return Ok(None);
            }
        };
        let template: RemoteRecord = match serde_json::from_value(document) {
            Ok(template) => template,
            Err(e) => {
                let err = SyncError::Validation(format!("share link {link_id}: {e}"));
                let _ = self.surface::<()>("read share link", Err(err)).await;
                return Ok(None);
            }
        };

        let app_id = ApplicationId::generate();
        let mut base = template.base;
        base.name = format!("{}{}", self.shared.config.copy_prefix, base.name);
        base.id = RecordId::new(app_id.as_str());
        let copy = MergedEntity::local(app_id, base);

        self.save(copy.clone(), true).await?;
        Ok(Some(copy))
    }

    /// Logs a failed mutation and reports it to the user once through the host.
    async fn surface<T>(&self, operation: &str, result: SyncResult<T>) -> SyncResult<T> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        warn!("failed to {}: {}", operation, err);
        if self.shared.config.notify_failures {
            let message = LogMessage::error(format!("Failed to {operation}: {err}"));
            if let Err(notify_err) = self.shared.host.send_log_message(&message).await {
                warn!("could not notify host: {}", notify_err);
            }
        }
        Err(err)
    }
}

struct SavePlan {
    remote_record: Option<RemoteRecord>,
    remote_existed: bool,
    remote_id: Option<RecordId>,
    local: Option<LocalRecord>,
    principal: Option<PrincipalId>,
}

impl Shared {
    fn ingest_local(&self, records: Vec<LocalRecord>) {
        let merged = {
            let mut state = lock(&self.state);
            if state.cancelled {
                return;
            }
            state.local = records;
            state.resynthesize()
        };
        (self.observer)(merged);
    }

    fn ingest_remote(&self, generation: u64, documents: Vec<Value>) {
        let records: Vec<RemoteRecord> = parse_snapshot(documents);
        let merged = {
            let mut state = lock(&self.state);
            if state.cancelled {
                return;
            }
            if state.remote_generation != generation {
                debug!(
                    "ignoring snapshot from replaced remote subscription {}",
                    generation
                );
                return;
            }
            state.remote = records;
            state.resynthesize()
        };
        (self.observer)(merged);
    }

    /// Replaces the remote subscription for a new principal. The previous
    /// subscription is disposed before the new one is opened.
    fn principal_changed(shared: &Arc<Self>, principal: Option<PrincipalId>) {
        let (generation, previous) = {
            let mut state = lock(&shared.state);
            if state.cancelled {
                return;
            }
            if state.principal == principal && state.remote_subscription.is_some() {
                return;
            }
            state.principal = principal.clone();
            state.remote_generation += 1;
            (state.remote_generation, state.remote_subscription.take())
        };
        if let Some(previous) = previous {
            previous.dispose();
        }

        info!("opening remote subscription for principal {:?}", principal);
        let weak: Weak<Self> = Arc::downgrade(shared);
        let subscription = shared.remote.subscribe(
            RemoteQuery::for_principal(principal),
            Arc::new(move |documents: Vec<Value>| {
                if let Some(shared) = weak.upgrade() {
                    shared.ingest_remote(generation, documents);
                }
            }),
        );

        let stale = {
            let mut state = lock(&shared.state);
            if state.cancelled || state.remote_generation != generation {
                Some(subscription)
            } else {
                state.remote_subscription = Some(subscription);
                None
            }
        };
        if let Some(stale) = stale {
            stale.dispose();
        }
    }
}
