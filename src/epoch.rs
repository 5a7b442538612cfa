//! Day-of-year epoch timestamps (`YYYY-DDDTHH:MM:SS.sssZ`).
//!
//! OEM epochs use an ordinal date rather than month/day; chrono's `%j`
//! specifier handles that directly. All epochs are UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Result, TrackerError};

/// Format of an epoch key without its trailing `Z`.
const EPOCH_FORMAT: &str = "%Y-%jT%H:%M:%S%.f";

/// Parses an epoch key to a UTC instant. The trailing `Z` is optional.
pub fn parse_epoch(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(trimmed, EPOCH_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TrackerError::MalformedTimestamp(raw.to_string()))
}
