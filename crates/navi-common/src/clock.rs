//! Wall-clock helpers.

use chrono::{SecondsFormat, Utc};

/// Current UTC time as an ISO-8601 string with millisecond precision,
/// e.g. `2026-10-18T09:30:12.345Z`.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
