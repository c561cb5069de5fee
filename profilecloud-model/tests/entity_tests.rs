use pretty_assertions::assert_eq;
use profilecloud_model::{
    BaseEntity, EntityKind, LocalRecord, MergedEntity, Payload, RemoteRecord, SyncState,
    parse_snapshot,
};
use profilecloud_types::{ApplicationId, PrincipalId, RecordId, Timestamp};
use serde_json::json;

fn profile_doc() -> serde_json::Value {
    json!({
        "id": "L1",
        "name": "Mixer",
        "description": "faders",
        "type": "PBF4",
        "configType": "profile",
        "modifiedAt": 100,
        "virtualPath": "Studio/Mixing",
        "configs": [
            {"controlElementNumber": 0, "events": [{"event": "0", "config": "--[[@sn]] self:gen('Volume')"}]},
            {"controlElementNumber": 1, "events": [{"event": 2, "config": "print(1)"}], "color": "red"}
        ],
        "fileName": "mixer.json",
        "cloudId": "R1"
    })
}

// ── Local records ────────────────────────────────────────────────

#[test]
fn local_record_reads_wire_names() {
    let record: LocalRecord = serde_json::from_value(profile_doc()).unwrap();
    assert_eq!(record.id(), &RecordId::new("L1"));
    assert_eq!(record.remote_id, Some(RecordId::new("R1")));
    assert_eq!(record.source_file_name, "mixer.json");
    assert_eq!(record.base.semantic_type, "PBF4");
    assert_eq!(record.base.kind(), EntityKind::Profile);
    assert_eq!(record.base.modified_at, Timestamp::from_millis(100));
    assert_eq!(record.base.hierarchy_path.as_deref(), Some("Studio/Mixing"));
}

#[test]
fn profile_payload_exposes_elements() {
    let record: LocalRecord = serde_json::from_value(profile_doc()).unwrap();
    let Payload::Profile(elements) = &record.base.payload else {
        panic!("expected profile payload");
    };
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].init_script(), Some("--[[@sn]] self:gen('Volume')"));
    assert_eq!(elements[1].init_script(), None);
    assert_eq!(elements[1].extra.get("color"), Some(&json!("red")));
}

#[test]
fn local_record_write_keeps_unknown_element_fields() {
    let record: LocalRecord = serde_json::from_value(profile_doc()).unwrap();
    let written = serde_json::to_value(&record).unwrap();
    assert_eq!(written["configs"][1]["color"], json!("red"));
    assert_eq!(written["configType"], json!("profile"));
    assert_eq!(written["cloudId"], json!("R1"));
    assert_eq!(written["type"], json!("PBF4"));
}

// ── Remote records ───────────────────────────────────────────────

#[test]
fn remote_record_defaults() {
    let record: RemoteRecord = serde_json::from_value(json!({
        "id": "R1",
        "name": "Shared",
        "type": "knob",
        "configType": "preset",
        "configs": {"controlElementNumber": 3, "events": []}
    }))
    .unwrap();
    assert!(!record.is_public);
    assert!(record.access_list.is_empty());
    assert_eq!(record.owner_id, None);
    assert_eq!(record.base.kind(), EntityKind::Preset);
}

#[test]
fn remote_record_grants_access_only_to_listed_principal() {
    let record: RemoteRecord = serde_json::from_value(json!({
        "id": "R1",
        "configType": "snippet",
        "configs": "print('hi')",
        "access": ["alice"],
        "owner": "alice",
        "public": true,
        "modifiedAt": {"seconds": 5, "nanoseconds": 0}
    }))
    .unwrap();
    assert!(record.grants_access(Some(&PrincipalId::new("alice"))));
    assert!(!record.grants_access(Some(&PrincipalId::new("bob"))));
    assert!(!record.grants_access(None));
    assert_eq!(record.base.modified_at.as_millis(), 5000);
    assert_eq!(record.base.payload.script_fragments(), vec!["print('hi')"]);
}

// ── Defensive parsing ────────────────────────────────────────────

#[test]
fn malformed_timestamp_is_coerced_not_rejected() {
    let before = Timestamp::now();
    let record: RemoteRecord = serde_json::from_value(json!({
        "id": "R2",
        "configType": "snippet",
        "modifiedAt": "garbage"
    }))
    .unwrap();
    assert!(record.base.modified_at >= before);
}

#[test]
fn parse_snapshot_drops_only_bad_records() {
    let docs = vec![
        json!({"id": "ok", "configType": "snippet"}),
        json!({"id": "bad-kind", "configType": "firmware"}),
        json!({"id": "bad-body", "configType": "preset", "configs": [1, 2]}),
        json!({"name": "missing id", "configType": "snippet"}),
    ];
    let records: Vec<RemoteRecord> = parse_snapshot(docs);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id().as_str(), "ok");
}

#[test]
fn loose_document_store_timestamp_keeps_the_record() {
    let docs = vec![
        json!({
            "id": "L1",
            "configType": "snippet",
            "modifiedAt": {"seconds": 1_700_000_000, "nanoseconds": 1.5e8},
            "fileName": "a.json"
        }),
        json!({
            "id": "L2",
            "configType": "snippet",
            "modifiedAt": {"seconds": "soon", "nanoseconds": 0}
        }),
    ];
    let before = Timestamp::now();
    let records: Vec<LocalRecord> = parse_snapshot(docs);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].base.modified_at.as_millis(), 1_700_000_000_150);
    assert!(records[1].base.modified_at >= before);
}

#[test]
fn missing_configs_default_for_every_kind() {
    let docs = vec![
        json!({"id": "p", "configType": "profile"}),
        json!({"id": "e", "configType": "preset", "configs": null}),
        json!({"id": "s", "configType": "snippet"}),
    ];
    let records: Vec<RemoteRecord> = parse_snapshot(docs);
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].base.payload, Payload::Profile(Vec::new()));
    match &records[1].base.payload {
        Payload::Preset(element) => {
            assert_eq!(element.control_element_number, 0);
            assert!(element.events.is_empty());
        }
        other => panic!("expected a preset, got {other:?}"),
    }
    assert_eq!(records[2].base.kind(), EntityKind::Snippet);
}

// ── Merged entities ──────────────────────────────────────────────

#[test]
fn merged_entity_serializes_flat() {
    let record: LocalRecord = serde_json::from_value(profile_doc()).unwrap();
    let merged = MergedEntity::local(ApplicationId::new("L1"), record.base);
    let value = serde_json::to_value(&merged).unwrap();
    assert_eq!(value["applicationId"], json!("L1"));
    assert_eq!(value["syncState"], json!("local-only"));
    assert_eq!(value["editable"], json!(true));
    assert_eq!(value["name"], json!("Mixer"));
    assert_eq!(merged.sync_state, SyncState::LocalOnly);
}

#[test]
fn empty_hierarchy_path_reads_as_absent() {
    let mut base: BaseEntity = serde_json::from_value(json!({
        "id": "x", "configType": "snippet", "virtualPath": ""
    }))
    .unwrap();
    let merged = MergedEntity::local(ApplicationId::new("x"), base.clone());
    assert_eq!(merged.hierarchy_path(), None);
    base.hierarchy_path = Some("A".into());
    assert_eq!(MergedEntity::local(ApplicationId::new("x"), base).hierarchy_path(), Some("A"));
}
