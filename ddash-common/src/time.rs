//! Timestamp utilities
//!
//! Upstream systems are not consistent about timestamp encoding: the flow-run
//! log emits RFC 3339 strings, some exports drop the offset, and a few emit
//! Unix epoch milliseconds. Everything is normalized to `DateTime<Utc>`.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time formatted as RFC 3339 with millisecond precision
pub fn now_rfc3339() -> String {
    now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp string
///
/// Accepts RFC 3339 (`2024-03-01T10:15:00Z`, `2024-03-01T10:15:00+01:00`) and
/// offset-less ISO 8601 (`2024-03-01T10:15:00.123`, read as UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a JSON timestamp value (string or epoch milliseconds)
pub fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
