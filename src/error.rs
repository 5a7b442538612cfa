//! Error taxonomy shared by the loader, query layer, and kinematics engine.
//!
//! Every failure a request can hit is a [`TrackerError`] variant. The HTTP
//! surface maps each variant to a status code and a machine-readable code
//! (see [`TrackerError::status`] and [`TrackerError::code`]); the display
//! text is the human-readable message sent back to the caller.

use thiserror::Error;

/// Result alias used throughout the query and kinematics layers.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// No dataset has been loaded (or it was deleted).
    #[error("The data set does not exist yet!")]
    DatasetUnavailable,

    /// A dataset is loaded but the requested section has no records.
    #[error("The data is empty!")]
    DatasetEmpty,

    #[error("Could not find the epoch for the given key: {0}")]
    NotFound(String),

    #[error("ERROR: {0}")]
    InvalidArgument(String),

    /// Upstream request failed, timed out, or returned a non-success status.
    #[error("Failed to fetch the ephemeris feed: {0}")]
    Fetch(String),

    #[error("Failed to parse the ephemeris feed: {0}")]
    Parse(String),

    #[error("Reverse geocoder returned an error - {0}")]
    GeocodeProvider(String),

    #[error("Epoch {0} has no usable position vector")]
    MissingPosition(String),

    #[error("Could not calculate the speed of the epoch for the given key: {0}")]
    MissingVelocity(String),

    #[error("Malformed epoch timestamp: {0}")]
    MalformedTimestamp(String),
}

impl TrackerError {
    /// HTTP status code for this error kind.
    pub fn status(&self) -> u16 {
        match self {
            TrackerError::DatasetUnavailable => 503,
            TrackerError::DatasetEmpty | TrackerError::NotFound(_) => 404,
            TrackerError::InvalidArgument(_) => 400,
            TrackerError::Fetch(_) | TrackerError::Parse(_) | TrackerError::GeocodeProvider(_) => {
                502
            }
            TrackerError::MissingPosition(_)
            | TrackerError::MissingVelocity(_)
            | TrackerError::MalformedTimestamp(_) => 422,
        }
    }

    /// Machine-readable error code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::DatasetUnavailable => "dataset_unavailable",
            TrackerError::DatasetEmpty => "dataset_empty",
            TrackerError::NotFound(_) => "not_found",
            TrackerError::InvalidArgument(_) => "bad_request",
            TrackerError::Fetch(_) => "upstream_fetch",
            TrackerError::Parse(_) => "upstream_parse",
            TrackerError::GeocodeProvider(_) => "geocode_error",
            TrackerError::MissingPosition(_) | TrackerError::MissingVelocity(_) => {
                "incomplete_record"
            }
            TrackerError::MalformedTimestamp(_) => "malformed_timestamp",
        }
    }
}
