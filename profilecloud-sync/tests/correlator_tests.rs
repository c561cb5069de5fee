use pretty_assertions::assert_eq;
use profilecloud_model::{LocalRecord, RemoteRecord, SyncState};
use profilecloud_sync::{IdentityCorrelator, RecordGroup, resolve};
use profilecloud_types::{ApplicationId, PrincipalId, RecordId};
use proptest::prelude::*;
use serde_json::json;

fn local(id: &str, remote_id: Option<&str>, modified_at: i64) -> LocalRecord {
    let mut doc = json!({
        "id": id,
        "name": format!("local {id}"),
        "configType": "snippet",
        "configs": "print(1)",
        "modifiedAt": modified_at,
        "fileName": format!("{id}.json"),
    });
    if let Some(remote_id) = remote_id {
        doc["cloudId"] = json!(remote_id);
    }
    serde_json::from_value(doc).unwrap()
}

fn remote(id: &str, access: &[&str], modified_at: i64) -> RemoteRecord {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("remote {id}"),
        "configType": "snippet",
        "configs": "print(2)",
        "modifiedAt": modified_at,
        "access": access,
        "owner": access.first(),
    }))
    .unwrap()
}

fn pass(
    correlator: &mut IdentityCorrelator,
    locals: &[LocalRecord],
    remotes: &[RemoteRecord],
) -> Vec<ApplicationId> {
    for record in locals {
        correlator.register_local(record.clone());
    }
    for record in remotes {
        correlator.register_remote(record.clone());
    }
    correlator.reconcile().keys().cloned().collect()
}

// ── Correlation ──────────────────────────────────────────────────

#[test]
fn unlinked_records_get_their_own_ids() {
    let mut c = IdentityCorrelator::new();
    let ids = pass(&mut c, &[local("L1", None, 1)], &[remote("R1", &[], 1)]);
    assert_eq!(ids, vec![ApplicationId::new("L1"), ApplicationId::new("R1")]);
}

#[test]
fn local_referencing_remote_takes_remote_id() {
    let mut c = IdentityCorrelator::new();
    let ids = pass(&mut c, &[local("L1", Some("R1"), 1)], &[remote("R1", &[], 1)]);
    assert_eq!(ids, vec![ApplicationId::new("R1")]);

    let group = c.group(&ApplicationId::new("R1")).unwrap();
    assert_eq!(group.local.as_ref().unwrap().id(), &RecordId::new("L1"));
    assert_eq!(group.remote.as_ref().unwrap().id(), &RecordId::new("R1"));
}

#[test]
fn local_keeps_identity_when_it_gains_a_remote() {
    let mut c = IdentityCorrelator::new();
    assert_eq!(pass(&mut c, &[local("L1", None, 1)], &[]), vec![ApplicationId::new("L1")]);

    // The remote appears first, then the local record picks up the reference.
    let ids = pass(&mut c, &[local("L1", None, 1)], &[remote("R9", &[], 2)]);
    assert_eq!(ids.len(), 2);

    let ids = pass(&mut c, &[local("L1", Some("R9"), 2)], &[remote("R9", &[], 2)]);
    assert_eq!(ids, vec![ApplicationId::new("L1")]);
    assert_eq!(
        c.application_id_of(&RecordId::new("R9")),
        Some(&ApplicationId::new("L1"))
    );
}

#[test]
fn remote_without_local_survives_local_deletion() {
    let mut c = IdentityCorrelator::new();
    pass(&mut c, &[local("L1", Some("R1"), 1)], &[remote("R1", &[], 1)]);

    let ids = pass(&mut c, &[], &[remote("R1", &[], 1)]);
    assert_eq!(ids, vec![ApplicationId::new("R1")]);
    assert!(c.group(&ApplicationId::new("R1")).unwrap().local.is_none());
}

#[test]
fn absent_records_are_forgotten() {
    let mut c = IdentityCorrelator::new();
    pass(&mut c, &[local("L1", None, 1), local("L2", None, 1)], &[]);
    let ids = pass(&mut c, &[local("L2", None, 1)], &[]);

    assert_eq!(ids, vec![ApplicationId::new("L2")]);
    assert_eq!(c.application_id_of(&RecordId::new("L1")), None);
    assert!(c.group(&ApplicationId::new("L1")).is_none());
}

#[test]
fn forget_drops_every_mapping() {
    let mut c = IdentityCorrelator::new();
    pass(&mut c, &[local("L1", Some("R1"), 1)], &[remote("R1", &[], 1)]);

    let removed = c.forget(&ApplicationId::new("R1")).unwrap();
    assert!(!removed.is_empty());
    assert!(c.groups().is_empty());
    assert_eq!(c.application_id_of(&RecordId::new("L1")), None);
    assert_eq!(c.application_id_of(&RecordId::new("R1")), None);
}

// ── Resolution ───────────────────────────────────────────────────

fn group(local: Option<LocalRecord>, remote: Option<RemoteRecord>) -> RecordGroup {
    RecordGroup { local, remote }
}

#[test]
fn newer_local_wins() {
    let g = group(Some(local("L1", Some("R1"), 200)), Some(remote("R1", &["u1"], 100)));
    let merged = resolve(&ApplicationId::new("R1"), &g, None).unwrap();
    assert_eq!(merged.sync_state, SyncState::LocalOnly);
    assert_eq!(merged.name(), "local L1");
    assert_eq!(merged.is_public, Some(false));
}

#[test]
fn newer_remote_wins() {
    let g = group(Some(local("L1", Some("R1"), 100)), Some(remote("R1", &["u1"], 200)));
    let merged = resolve(&ApplicationId::new("R1"), &g, None).unwrap();
    assert_eq!(merged.sync_state, SyncState::RemoteOnly);
    assert_eq!(merged.name(), "remote R1");
    assert_eq!(merged.owner_id, Some(PrincipalId::new("u1")));
}

#[test]
fn equal_timestamps_are_synced_and_use_local() {
    let g = group(Some(local("L1", Some("R1"), 150)), Some(remote("R1", &["u1"], 150)));
    let merged = resolve(&ApplicationId::new("R1"), &g, None).unwrap();
    assert_eq!(merged.sync_state, SyncState::Synced);
    assert_eq!(merged.name(), "local L1");
    // Local copy carries no owner; the remote's fills in.
    assert_eq!(merged.owner_id, Some(PrincipalId::new("u1")));
}

#[test]
fn editable_requires_access_to_remote_copy() {
    let u1 = PrincipalId::new("u1");
    let u2 = PrincipalId::new("u2");
    let app = ApplicationId::new("R1");

    let local_only = group(Some(local("L1", None, 1)), None);
    assert!(resolve(&app, &local_only, None).unwrap().editable);

    let shared = group(None, Some(remote("R1", &["u1"], 1)));
    assert!(resolve(&app, &shared, Some(&u1)).unwrap().editable);
    assert!(!resolve(&app, &shared, Some(&u2)).unwrap().editable);
    assert!(!resolve(&app, &shared, None).unwrap().editable);
}

#[test]
fn empty_group_resolves_to_nothing() {
    assert!(resolve(&ApplicationId::new("x"), &RecordGroup::default(), None).is_none());
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn repeated_passes_are_stable(
        linked in proptest::collection::vec(any::<bool>(), 1..12),
        with_remote in proptest::collection::vec(any::<bool>(), 1..12),
    ) {
        let locals: Vec<LocalRecord> = linked
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let remote_id = format!("R{i}");
                local(&format!("L{i}"), link.then_some(remote_id.as_str()), 1)
            })
            .collect();
        let remotes: Vec<RemoteRecord> = with_remote
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .map(|(i, _)| remote(&format!("R{i}"), &[], 1))
            .collect();

        let mut c = IdentityCorrelator::new();
        let first = pass(&mut c, &locals, &remotes);
        let second = pass(&mut c, &locals, &remotes);
        prop_assert_eq!(&first, &second);

        // Every local record appears in exactly one group.
        for record in &locals {
            let owners = c
                .groups()
                .values()
                .filter(|g| g.local.as_ref().map(|l| l.id()) == Some(record.id()))
                .count();
            prop_assert_eq!(owners, 1);
        }
    }
}
