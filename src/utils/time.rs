use chrono::Duration;
use chrono::NaiveDateTime;
use chrono::Utc;

use crate::constants::VERSION_FORMAT;

/// Returns a version stamp strictly greater than `previous`.
///
/// Stamps are UTC date/time strings with microsecond resolution, so
/// lexicographic and chronological order coincide.
pub fn next_version(previous: &str) -> String {
    next_version_at(previous, Utc::now().naive_utc())
}

pub(crate) fn next_version_at(
    previous: &str,
    now: NaiveDateTime,
) -> String {
    let candidate = now.format(VERSION_FORMAT).to_string();
    if candidate.as_str() > previous {
        return candidate;
    }
    match NaiveDateTime::parse_from_str(previous, VERSION_FORMAT) {
        Ok(prev) => (prev + Duration::microseconds(1)).format(VERSION_FORMAT).to_string(),
        // Unparsable stamps still move forward
        Err(_) => format!("{previous}0"),
    }
}

/// Compact form of a version used inside backup file names:
/// `2026-10-18 12:00:00.000001` becomes `20261018120000.000001`.
pub fn version_tag(version: &str) -> String {
    version.chars().filter(|c| !matches!(c, '-' | ':' | ' ')).collect()
}
