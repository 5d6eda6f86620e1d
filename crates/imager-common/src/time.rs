//! Timestamp parsing and formatting for exposure start times.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Formats accepted after any trailing `UTC`/`Z` marker is stripped.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y%m%d %H%M%S%.f",
];

/// Parse an exposure timestamp as written by the imager firmware.
///
/// Accepts `2019-01-01 06:00:00.016 UTC`, the lower-cased `... utc` form found
/// in PGM comments, ISO 8601 with `T`/`Z`, and RFC 3339 with an offset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let bare = strip_utc_marker(trimmed);
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(bare, fmt).ok())
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

fn strip_utc_marker(s: &str) -> &str {
    let len = s.len();
    for marker in [" UTC", " utc", "UTC", "utc", "Z", "z"] {
        if s.ends_with(marker) {
            return s[..len - marker.len()].trim_end();
        }
    }
    s
}

/// Canonical string form, millisecond precision: `2019-01-01 06:00:00.016 UTC`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1_000_000.0
}
