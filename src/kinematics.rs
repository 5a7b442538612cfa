//! Speed and sub-point calculations for a single state vector.
//!
//! The geodetic transform is a spherical-Earth approximation: latitude and
//! longitude come straight from the Cartesian position, and the longitude
//! is shifted by the hour angle of the epoch's time of day plus a fixed
//! empirical offset. It is not a proper inertial-to-Earth-fixed rotation.

use chrono::{DateTime, Timelike, Utc};

use crate::epoch::parse_epoch;
use crate::error::{Result, TrackerError};
use crate::geocode::ReverseGeocoder;
use crate::models::{Dataset, Geodetic, Location, LocationResult, Measure, StateVector};
use crate::query;

/// Mean Earth radius in kilometres.
pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

/// Empirical longitude offset in degrees.
pub const LONGITUDE_OFFSET_DEG: f64 = 32.0;

/// Earth rotation, degrees per hour.
const DEGREES_PER_HOUR: f64 = 360.0 / 24.0;

/// Magnitude of the velocity vector, in the `X_DOT` units.
pub fn speed(sv: &StateVector) -> Result<Measure> {
    let (x, y, z) = sv
        .velocity()
        .ok_or_else(|| TrackerError::MissingVelocity(sv.epoch.clone()))?;
    Ok(Measure::new(
        (x.value.powi(2) + y.value.powi(2) + z.value.powi(2)).sqrt(),
        x.units.clone(),
    ))
}

/// Latitude, longitude, and altitude of the sub-point.
pub fn geodetic(sv: &StateVector) -> Result<Geodetic> {
    let (x, y, z) = sv
        .position()
        .ok_or_else(|| TrackerError::MissingPosition(sv.epoch.clone()))?;
    let time = parse_epoch(&sv.epoch)?;
    let (x, y, z, units) = (x.value, y.value, z.value, x.units.clone());

    let latitude = z.atan2((x.powi(2) + y.powi(2)).sqrt()).to_degrees();
    let hour_angle =
        ((time.hour() as f64 - 12.0) + time.minute() as f64 / 60.0) * DEGREES_PER_HOUR;
    let longitude = y.atan2(x).to_degrees() - hour_angle + LONGITUDE_OFFSET_DEG;
    let altitude = (x.powi(2) + y.powi(2) + z.powi(2)).sqrt() - MEAN_EARTH_RADIUS_KM;

    Ok(Geodetic {
        latitude: wrap_degrees(latitude),
        longitude: wrap_degrees(longitude),
        altitude,
        units,
    })
}

/// Wraps an angle into (-180, 180].
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Sub-point, reverse geocode, and speed for one state vector.
pub async fn describe(sv: &StateVector, geocoder: &dyn ReverseGeocoder) -> Result<LocationResult> {
    let point = geodetic(sv)?;
    let speed = speed(sv)?;
    let geo = geocoder.reverse(point.latitude, point.longitude).await?;

    Ok(LocationResult {
        epoch: sv.epoch.clone(),
        location: Location {
            latitude: point.latitude,
            longitude: point.longitude,
            altitude: Measure::new(point.altitude, point.units),
        },
        geo,
        speed,
    })
}

/// Location of the epoch with key `key`.
pub async fn locate(
    dataset: &Dataset,
    key: &str,
    geocoder: &dyn ReverseGeocoder,
) -> Result<LocationResult> {
    let sv = query::get_epoch(dataset, key)?;
    describe(sv, geocoder).await
}

/// Location of the epoch nearest to `now`.
pub async fn locate_nearest(
    dataset: &Dataset,
    now: DateTime<Utc>,
    geocoder: &dyn ReverseGeocoder,
) -> Result<LocationResult> {
    let sv = query::nearest_to(dataset, now)?;
    describe(sv, geocoder).await
}
