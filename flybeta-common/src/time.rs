//! Timestamp utilities

use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Naive layouts accepted in addition to RFC 3339; interpreted as UTC
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Parse a source timestamp
///
/// Accepts RFC 3339 (any offset, normalized to UTC) or one of the naive
/// `YYYY-MM-DD HH:MM[:SS[.fff]]` layouts, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(Error::InvalidInput(format!("Unrecognized timestamp: '{}'", raw)))
}

/// ISO-8601 rendering used in outbound messages (millisecond precision, `Z`)
pub fn format_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
