//! Last-writer-wins resolution of a correlated record pair.
//!
//! The copy with the strictly greater `modified_at` wins. Identical
//! timestamps mean both sources agree: the pair is reported as synced and the
//! local copy's data is used.

use crate::correlator::RecordGroup;
use profilecloud_model::{MergedEntity, SyncState};
use profilecloud_types::{ApplicationId, PrincipalId};
use std::cmp::Ordering;

/// Resolves one group into its merged view.
///
/// Returns `None` only for an empty group. A config is editable when it has
/// no remote copy, or when `principal` is on the remote copy's access list.
#[must_use]
pub fn resolve(
    app_id: &ApplicationId,
    group: &RecordGroup,
    principal: Option<&PrincipalId>,
) -> Option<MergedEntity> {
    let (base, owner_id, sync_state) = match (&group.local, &group.remote) {
        (None, None) => return None,
        (Some(local), None) => (&local.base, local.owner_id.clone(), SyncState::LocalOnly),
        (None, Some(remote)) => (&remote.base, remote.owner_id.clone(), SyncState::RemoteOnly),
        (Some(local), Some(remote)) => {
            match local.base.modified_at.cmp(&remote.base.modified_at) {
                Ordering::Greater => (
                    &local.base,
                    local.owner_id.clone().or_else(|| remote.owner_id.clone()),
                    SyncState::LocalOnly,
                ),
                Ordering::Less => (
                    &remote.base,
                    remote.owner_id.clone().or_else(|| local.owner_id.clone()),
                    SyncState::RemoteOnly,
                ),
                Ordering::Equal => (
                    &local.base,
                    local.owner_id.clone().or_else(|| remote.owner_id.clone()),
                    SyncState::Synced,
                ),
            }
        }
    };

    let editable = match &group.remote {
        None => true,
        Some(remote) => remote.grants_access(principal),
    };

    Some(MergedEntity {
        application_id: app_id.clone(),
        base: base.clone(),
        owner_id,
        editable,
        sync_state,
        is_public: group.remote.as_ref().map(|r| r.is_public),
    })
}
