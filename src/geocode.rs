//! Reverse geocoding of sub-points.
//!
//! Defines the [`ReverseGeocoder`] trait and two implementations:
//! - **[`NominatimGeocoder`]** — calls a Nominatim-compatible `/reverse`
//!   endpoint (OpenStreetMap by default).
//! - **[`DisabledGeocoder`]** — never matches; every lookup yields the ocean
//!   sentinel. Used when `geocode.enabled = false`.
//!
//! Nominatim answers `{"error": "Unable to geocode"}` for points with no
//! nearby place, which is the usual case over open water. That is reported
//! as [`GeoLookup::Ocean`], not as an error. Transport failures and
//! non-success statuses become [`TrackerError::GeocodeProvider`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GeocodeConfig;
use crate::error::{Result, TrackerError};
use crate::models::GeoLookup;

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Looks up the place under `(latitude, longitude)` in degrees.
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeoLookup>;
}

/// Builds the geocoder selected by configuration.
pub fn create_geocoder(config: &GeocodeConfig) -> anyhow::Result<Arc<dyn ReverseGeocoder>> {
    if !config.enabled {
        return Ok(Arc::new(DisabledGeocoder));
    }
    Ok(Arc::new(NominatimGeocoder::new(config)?))
}

pub struct DisabledGeocoder;

#[async_trait]
impl ReverseGeocoder for DisabledGeocoder {
    async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<GeoLookup> {
        Ok(GeoLookup::Ocean)
    }
}

pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    zoom: u8,
    language: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/reverse", config.base_url.trim_end_matches('/')),
            zoom: config.zoom,
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeoLookup> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", self.zoom.to_string()),
                ("accept-language", self.language.clone()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "reverse geocode request failed");
                TrackerError::GeocodeProvider(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "reverse geocoder returned an error status");
            return Err(TrackerError::GeocodeProvider(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TrackerError::GeocodeProvider(format!("invalid response: {}", e)))?;

        Ok(classify_payload(payload))
    }
}

/// A payload with an `error` field, or one that isn't an object, means no
/// place was found.
fn classify_payload(payload: serde_json::Value) -> GeoLookup {
    match payload.as_object() {
        Some(obj) if !obj.is_empty() && !obj.contains_key("error") => GeoLookup::Place(payload),
        _ => GeoLookup::Ocean,
    }
}
