//! Epoch queries over a loaded dataset.
//!
//! All lookups walk the state-vector list in document order; there is no
//! secondary index.

use chrono::{DateTime, Utc};

use crate::epoch::parse_epoch;
use crate::error::{Result, TrackerError};
use crate::models::{Dataset, StateVector};

/// Offset/limit slice over the epoch list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochWindow {
    pub offset: usize,
    /// `None` means "to the end of the list".
    pub limit: Option<usize>,
}

impl EpochWindow {
    /// Builds a window from raw query-string values.
    ///
    /// Each value must be a non-negative integer when present.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self> {
        let limit = limit.map(|v| parse_count(v, "limit")).transpose()?;
        let offset = offset
            .map(|v| parse_count(v, "offset"))
            .transpose()?
            .unwrap_or(0);
        Ok(Self { offset, limit })
    }

    /// Builds a window from decoded query pairs.
    ///
    /// A repeated `limit` or `offset` is rejected; other keys are ignored.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self> {
        let limit = single_value(pairs, "limit")?;
        let offset = single_value(pairs, "offset")?;
        Self::parse(limit, offset)
    }
}

fn single_value<'a>(pairs: &'a [(String, String)], name: &str) -> Result<Option<&'a str>> {
    let mut values = pairs.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let first = values.next();
    if values.next().is_some() {
        return Err(TrackerError::InvalidArgument(format!(
            "Please send a single integer for the {}!",
            name
        )));
    }
    Ok(first)
}

fn parse_count(raw: &str, name: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|_| {
        TrackerError::InvalidArgument(format!("Please send an integer for the {}!", name))
    })
}

/// State vectors of the dataset, or `DatasetEmpty` when there are none.
pub fn state_vectors(dataset: &Dataset) -> Result<&[StateVector]> {
    match dataset.state_vectors.as_deref() {
        Some(vectors) if !vectors.is_empty() => Ok(vectors),
        _ => Err(TrackerError::DatasetEmpty),
    }
}

/// Epoch keys in `[offset, offset + limit)`, clamped to the list length.
pub fn list_epochs(dataset: &Dataset, window: EpochWindow) -> Result<Vec<String>> {
    let vectors = state_vectors(dataset)?;
    let start = window.offset.min(vectors.len());
    let end = match window.limit {
        Some(limit) => start.saturating_add(limit).min(vectors.len()),
        None => vectors.len(),
    };
    Ok(vectors[start..end].iter().map(|sv| sv.epoch.clone()).collect())
}

/// First state vector whose epoch equals `key` exactly.
pub fn get_epoch<'a>(dataset: &'a Dataset, key: &str) -> Result<&'a StateVector> {
    state_vectors(dataset)?
        .iter()
        .find(|sv| sv.epoch == key)
        .ok_or_else(|| TrackerError::NotFound(key.to_string()))
}

/// State vector whose epoch is closest to `now`.
///
/// Ties go to the earlier record in document order.
pub fn nearest_to(dataset: &Dataset, now: DateTime<Utc>) -> Result<&StateVector> {
    let vectors = state_vectors(dataset)?;
    let mut best: Option<(&StateVector, i64)> = None;

    for sv in vectors {
        let instant = parse_epoch(&sv.epoch)?;
        let distance = distance_nanos(instant, now);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((sv, distance)),
        }
    }

    best.map(|(sv, _)| sv).ok_or(TrackerError::DatasetEmpty)
}

/// [`nearest_to`] against the wall clock.
pub fn nearest_to_now(dataset: &Dataset) -> Result<&StateVector> {
    nearest_to(dataset, Utc::now())
}

fn distance_nanos(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    let delta = (a - b).abs();
    delta
        .num_nanoseconds()
        .unwrap_or_else(|| delta.num_milliseconds().saturating_mul(1_000_000))
}
