use profilecloud_types::Timestamp;
use proptest::prelude::*;
use serde_json::json;

fn read(value: serde_json::Value) -> Timestamp {
    serde_json::from_value(value).unwrap()
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn from_millis_roundtrip() {
    let ts = Timestamp::from_millis(1_700_000_000_123);
    assert_eq!(ts.as_millis(), 1_700_000_000_123);
}

#[test]
fn now_is_recent() {
    let ts = Timestamp::now();
    assert!(ts.as_millis() > 1_600_000_000_000);
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_rfc3339() {
    let ts = Timestamp::parse("2024-01-02T03:04:05.006Z").unwrap();
    assert_eq!(ts.as_millis(), 1_704_164_645_006);
}

#[test]
fn parse_numeric_string() {
    assert_eq!(Timestamp::parse("100").unwrap().as_millis(), 100);
}

#[test]
fn parse_garbage_is_error() {
    assert!(Timestamp::parse("yesterday-ish").is_err());
}

#[test]
fn parse_or_now_coerces_garbage() {
    let before = Timestamp::now();
    let ts = Timestamp::parse_or_now("???");
    assert!(ts >= before);
}

// ── Lenient deserialization ──────────────────────────────────────

#[test]
fn deserialize_millis() {
    assert_eq!(read(json!(100)).as_millis(), 100);
}

#[test]
fn deserialize_iso_string() {
    assert_eq!(
        read(json!("1970-01-01T00:00:01Z")).as_millis(),
        1000
    );
}

#[test]
fn deserialize_document_store_shape() {
    assert_eq!(
        read(json!({"seconds": 2, "nanoseconds": 500_000_000})).as_millis(),
        2500
    );
    assert_eq!(read(json!({"_seconds": 3, "_nanoseconds": 0})).as_millis(), 3000);
}

#[test]
fn deserialize_malformed_coerces_to_now() {
    let before = Timestamp::now();
    assert!(read(json!(null)) >= before);
    assert!(read(json!("not a date")) >= before);
    assert!(read(json!({"unrelated": 1})) >= before);
    assert!(read(json!([1, 2])) >= before);
}

#[test]
fn document_store_fields_are_read_loosely() {
    assert_eq!(
        read(json!({"seconds": 1_700_000_000, "nanoseconds": 1.5e8})).as_millis(),
        1_700_000_000_150
    );
    assert_eq!(read(json!({"seconds": 2.0})).as_millis(), 2000);
    assert_eq!(read(json!({"seconds": "4", "nanoseconds": null})).as_millis(), 4000);
}

#[test]
fn unreadable_document_store_fields_coerce_to_now() {
    let before = Timestamp::now();
    assert!(read(json!({"seconds": "soon", "nanoseconds": 0})) >= before);
    assert!(read(json!({"seconds": 5, "nanoseconds": {"x": 1}})) >= before);
    assert!(read(json!({"seconds": true})) >= before);
}

#[test]
fn serializes_as_millis() {
    let ts = Timestamp::from_millis(42);
    assert_eq!(serde_json::to_value(ts).unwrap(), json!(42));
}

proptest! {
    #[test]
    fn ordering_follows_millis(a in any::<i64>(), b in any::<i64>()) {
        let (ta, tb) = (Timestamp::from_millis(a), Timestamp::from_millis(b));
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
    }

    #[test]
    fn json_roundtrip_preserves_value(ms in 0i64..4_000_000_000_000) {
        let ts = Timestamp::from_millis(ms);
        let back: Timestamp = serde_json::from_value(serde_json::to_value(ts).unwrap()).unwrap();
        prop_assert_eq!(back, ts);
    }
}
