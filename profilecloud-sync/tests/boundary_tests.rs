use pretty_assertions::assert_eq;
use profilecloud_model::{LocalRecord, RemoteRecord};
use profilecloud_sync::{
    ChannelHostBridge, HostBridge, HostOperation, HostReply, ImportConfigRequest,
    LocalSnapshotHub, LogMessage, MemoryRemoteStore, PrincipalCell, PrincipalSource, RemoteQuery,
    RemoteStore, ShareLinkSource, SyncError,
};
use profilecloud_types::{PrincipalId, RecordId};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn remote_doc(id: &str, access: &[&str], public: bool) -> Value {
    json!({
        "id": id,
        "name": id,
        "configType": "snippet",
        "configs": "",
        "modifiedAt": 1,
        "access": access,
        "public": public,
    })
}

fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Arc<dyn Fn(T) + Send + Sync>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Arc::new(move |value| sink.lock().unwrap().push(value)))
}

// ── Local snapshot hub ───────────────────────────────────────────

#[test]
fn hub_fans_out_to_every_listener() {
    let hub = LocalSnapshotHub::new();
    let (a, listener_a) = recorder();
    let (b, listener_b) = recorder();
    let _sa = hub.subscribe(listener_a);
    let sb = hub.subscribe(listener_b);
    assert_eq!(hub.listener_count(), 2);

    let record: LocalRecord =
        serde_json::from_value(json!({"id": "L1", "configType": "snippet"})).unwrap();
    hub.publish(vec![record]);
    assert_eq!(a.lock().unwrap().len(), 1);
    assert_eq!(b.lock().unwrap().len(), 1);
    assert_eq!(hub.latest().len(), 1);

    drop(sb);
    hub.publish(Vec::new());
    assert_eq!(a.lock().unwrap().len(), 2);
    assert_eq!(b.lock().unwrap().len(), 1);
    assert_eq!(hub.listener_count(), 1);
}

// ── Principal ────────────────────────────────────────────────────

#[test]
fn principal_cell_emits_current_then_changes() {
    let cell = PrincipalCell::new(Some(PrincipalId::new("u1")));
    let (seen, listener) = recorder();
    let subscription = cell.subscribe(listener);

    cell.set(Some(PrincipalId::new("u1")));
    cell.set(None);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some(PrincipalId::new("u1")), None]
    );

    subscription.dispose();
    cell.set(Some(PrincipalId::new("u2")));
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(cell.get(), Some(PrincipalId::new("u2")));
}

// ── Remote store ─────────────────────────────────────────────────

#[test]
fn query_matches_public_or_accessible() {
    let anonymous = RemoteQuery::for_principal(None);
    let alice = RemoteQuery::for_principal(Some(PrincipalId::new("alice")));

    assert!(anonymous.matches_document(&remote_doc("a", &[], true)));
    assert!(!anonymous.matches_document(&remote_doc("b", &["alice"], false)));
    assert!(alice.matches_document(&remote_doc("b", &["alice"], false)));
    assert!(!alice.matches_document(&remote_doc("c", &["bob"], false)));

    let record: RemoteRecord = serde_json::from_value(remote_doc("b", &["alice"], false)).unwrap();
    assert!(alice.matches(&record));
    assert!(!anonymous.matches(&record));
}

#[tokio::test]
async fn store_subscription_emits_initial_and_on_write() {
    let store = MemoryRemoteStore::new();
    store.insert_document(remote_doc("pub", &[], true));
    store.insert_document(remote_doc("mine", &["alice"], false));
    store.insert_document(remote_doc("theirs", &["bob"], false));

    let (seen, listener) = recorder::<Vec<Value>>();
    let subscription = store.subscribe(
        RemoteQuery::for_principal(Some(PrincipalId::new("alice"))),
        listener,
    );
    assert_eq!(seen.lock().unwrap()[0].len(), 2);

    store.set_visibility(&RecordId::new("theirs"), true).await.unwrap();
    assert_eq!(seen.lock().unwrap().last().unwrap().len(), 3);

    store.delete(&RecordId::new("pub")).await.unwrap();
    assert_eq!(seen.lock().unwrap().last().unwrap().len(), 2);

    subscription.dispose();
    assert_eq!(store.subscriber_count(), 0);
    store.delete(&RecordId::new("mine")).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn store_upsert_replaces_document() {
    let store = MemoryRemoteStore::new();
    let mut record: RemoteRecord =
        serde_json::from_value(remote_doc("r", &["alice"], false)).unwrap();
    store.upsert(&record).await.unwrap();
    record.base.name = "renamed".into();
    store.upsert(&record).await.unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.document(&RecordId::new("r")).unwrap()["name"], json!("renamed"));
}

#[tokio::test]
async fn store_errors() {
    let store = MemoryRemoteStore::new();
    let missing = store.set_visibility(&RecordId::new("nope"), true).await;
    assert!(matches!(missing, Err(SyncError::NotFound(_))));
    assert!(store.delete(&RecordId::new("nope")).await.is_ok());

    let link = store.fetch_share_link("nope").await;
    assert!(matches!(link, Err(SyncError::NotFound(_))));

    store.set_offline(true);
    let record: RemoteRecord = serde_json::from_value(remote_doc("r", &[], false)).unwrap();
    assert!(matches!(store.upsert(&record).await, Err(SyncError::Remote(_))));
    assert!(store.is_empty());
}

// ── Host bridge ──────────────────────────────────────────────────

#[tokio::test]
async fn host_request_roundtrip() {
    let (bridge, mut requests) = ChannelHostBridge::new();
    let host = tokio::spawn(async move {
        let request = requests.recv().await.unwrap();
        assert_eq!(request.operation, HostOperation::SendLogMessage);
        assert_eq!(request.payload, json!({"type": "error", "message": "boom"}));
        request.respond(HostReply::ok(Some(json!("shown"))));
    });

    bridge.send_log_message(&LogMessage::error("boom")).await.unwrap();
    host.await.unwrap();
}

#[tokio::test]
async fn host_rejection_is_external_write_failure() {
    let (bridge, mut requests) = ChannelHostBridge::new();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            request.respond(HostReply::rejected("disk full"));
        }
    });

    let err = bridge.login().await.unwrap_err();
    match err {
        SyncError::ExternalWriteFailure { operation, detail } => {
            assert_eq!(operation, "loginToProfileCloud");
            assert_eq!(detail, "disk full");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn host_gone_is_channel_closed() {
    let (bridge, requests) = ChannelHostBridge::new();
    drop(requests);
    assert!(matches!(bridge.logout().await, Err(SyncError::ChannelClosed)));
}

#[test]
fn import_payload_overrides_identity_fields() {
    let record: LocalRecord = serde_json::from_value(json!({
        "id": "R1",
        "name": "Lead",
        "configType": "snippet",
        "configs": "x",
        "modifiedAt": 5,
    }))
    .unwrap();
    let request = ImportConfigRequest {
        entity: record.base,
        local_id: RecordId::new("L1"),
        remote_id: Some(RecordId::new("R1")),
        file_name: None,
        owner_id: Some(PrincipalId::new("u1")),
    };
    let payload = request.to_payload().unwrap();
    assert_eq!(payload["id"], json!("L1"));
    assert_eq!(payload["cloudId"], json!("R1"));
    assert_eq!(payload["owner"], json!("u1"));
    assert_eq!(payload.get("fileName"), None);
    assert_eq!(payload["name"], json!("Lead"));
    assert_eq!(
        HostOperation::ImportConfig.channel_name(),
        serde_json::to_value(HostOperation::ImportConfig).unwrap()
    );
}
