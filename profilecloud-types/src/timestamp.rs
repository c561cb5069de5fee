//! Millisecond timestamps for last-writer-wins resolution.
//!
//! Both config sources serialize `modifiedAt`/`createdAt` differently: local
//! files carry ISO strings or epoch milliseconds, the remote document store
//! hands back `{seconds, nanoseconds}` objects. Reads are lenient: anything
//! that cannot be understood is coerced to "now" instead of rejecting the
//! surrounding record.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns epoch milliseconds.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Converts to a chrono UTC datetime, if representable.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// Parses an RFC 3339 string or a decimal millisecond count.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        if let Ok(millis) = trimmed.parse::<i64>() {
            return Ok(Self(millis));
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| Self(dt.timestamp_millis()))
            .map_err(|e| crate::Error::InvalidTimestamp(format!("{trimmed}: {e}")))
    }

    /// Parses like [`Timestamp::parse`] but coerces failures to now.
    #[must_use]
    pub fn parse_or_now(s: &str) -> Self {
        match Self::parse(s) {
            Ok(ts) => ts,
            Err(e) => {
                debug!("coercing unreadable timestamp to now: {}", e);
                Self::now()
            }
        }
    }

    fn from_parts(seconds: i64, nanos: i64) -> Self {
        Self(seconds.saturating_mul(1000).saturating_add(nanos / 1_000_000))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a timestamp")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Timestamp(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Timestamp(i64::try_from(v).unwrap_or(i64::MAX)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() {
            Ok(Timestamp(v as i64))
        } else {
            Ok(Timestamp::now())
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Timestamp::parse_or_now(v))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(Timestamp::now())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Timestamp::now())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Timestamp::now())
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<de::IgnoredAny>()?.is_some() {}
        Ok(Timestamp::now())
    }

    // Document-store timestamps: {seconds, nanoseconds} or {_seconds, _nanoseconds}.
    // Field values are read loosely; one that is not a number coerces the
    // whole timestamp to now.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut seconds = Value::Null;
        let mut nanos = Value::Null;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "seconds" | "_seconds" => seconds = map.next_value()?,
                "nanoseconds" | "_nanoseconds" => nanos = map.next_value()?,
                _ => {
                    map.next_value::<de::IgnoredAny>()?;
                }
            }
        }

        let parsed_nanos = if nanos.is_null() { Some(0) } else { loose_integer(&nanos) };
        match (loose_integer(&seconds), parsed_nanos) {
            (Some(s), Some(n)) => Ok(Timestamp::from_parts(s, n)),
            _ => {
                debug!(
                    "coercing unreadable timestamp to now: seconds={} nanoseconds={}",
                    seconds, nanos
                );
                Ok(Timestamp::now())
            }
        }
    }
}

/// Reads an integer, a finite float (truncated) or a numeric string.
fn loose_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
