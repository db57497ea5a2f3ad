//! Ready-made JSON revivers.
//!
//! A [`crate::Reviver`] sees every decoded value with its key and returns the
//! value to keep. These helpers cover the usual case of ISO-8601 timestamps.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$")
        .expect("timestamp pattern is valid")
});

/// Returns `true` for strings shaped like `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn is_iso_timestamp(value: &str) -> bool {
    ISO_TIMESTAMP.is_match(value)
}

/// Parses a `YYYY-MM-DDTHH:MM:SS.sssZ` string.
///
/// ```
/// use wirefetch::reviver::parse_iso_timestamp;
///
/// let at = parse_iso_timestamp("2024-03-01T12:00:00.250Z").unwrap();
/// assert_eq!(at.millisecond(), 250);
/// assert!(parse_iso_timestamp("2024-03-01").is_none());
/// ```
pub fn parse_iso_timestamp(value: &str) -> Option<OffsetDateTime> {
    if !is_iso_timestamp(value) {
        return None;
    }
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

/// Reviver replacing ISO timestamps with Unix epoch milliseconds.
///
/// Strings that only look like timestamps but are not valid dates are kept.
pub fn iso_timestamps_to_millis(_key: &str, value: Value) -> Value {
    let millis = value
        .as_str()
        .and_then(parse_iso_timestamp)
        .and_then(|at| i64::try_from(at.unix_timestamp_nanos() / 1_000_000).ok());
    match millis {
        Some(millis) => Value::from(millis),
        None => value,
    }
}
