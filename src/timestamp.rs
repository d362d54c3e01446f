//! Serde helpers for optional absolute timestamps.
//!
//! Payloads produced by older clients encode "no expiry" as the zero time
//! `0001-01-01T00:00:00Z` rather than omitting the field. Both forms, and
//! `null`, decode to `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Unix seconds of `0001-01-01T00:00:00Z`.
const ZERO_TIME_UNIX: i64 = -62_135_596_800;

pub fn is_zero_time(instant: &DateTime<Utc>) -> bool {
    instant.timestamp() == ZERO_TIME_UNIX && instant.timestamp_subsec_nanos() == 0
}

pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(instant) => serializer.serialize_str(&instant.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|instant| !is_zero_time(instant)))
}
