//! Timestamp utilities
//!
//! Feedback timestamps are stored as `YYYY-MM-DD HH:MM:SS` in UTC, the same
//! text form SQLite produces for `CURRENT_TIMESTAMP`, so rows written by the
//! column default and rows written by the store sort identically.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// Storage format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC timestamp truncated to whole seconds
pub fn now_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Format a timestamp for storage
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Zone-less layouts found in stores written by earlier revisions, all UTC
///
/// `%.f` also matches when there is no fractional part.
const LEGACY_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a stored timestamp
///
/// Accepts the storage format, the same with fractional seconds or a `T`
/// separator, and RFC 3339 with an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    LEGACY_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Whether `raw` is already in the storage format
pub fn is_storage_format(raw: &str) -> bool {
    raw.len() == 19 && NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).is_ok()
}
