//! Upstream ephemeris fetch.
//!
//! [`Loader::load`] performs one GET against the configured feed URL and
//! parses the body with [`oem::parse_document`]. It never touches the
//! [`DocumentStore`](crate::store::DocumentStore); committing the result is
//! the caller's job, so a failed load leaves the current dataset in place.

use std::time::{Duration, Instant};

use crate::config::UpstreamConfig;
use crate::error::{Result, TrackerError};
use crate::models::Dataset;
use crate::oem;

pub struct Loader {
    client: reqwest::Client,
    url: String,
}

impl Loader {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches and parses the feed.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::Fetch`] on transport errors, timeouts, or a
    ///   non-success status.
    /// - [`TrackerError::Parse`] when the body is not a usable OEM document.
    pub async fn load(&self) -> Result<Dataset> {
        let started = Instant::now();
        let body = self.fetch().await?;
        let dataset = oem::parse_document(&body).inspect_err(|e| {
            tracing::warn!(url = %self.url, error = %e, "upstream document did not parse");
        })?;

        tracing::info!(
            url = %self.url,
            epochs = dataset.epoch_count(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ephemeris loaded"
        );
        Ok(dataset)
    }

    async fn fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            tracing::warn!(url = %self.url, error = %e, "upstream request failed");
            TrackerError::Fetch(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, %status, "upstream returned an error status");
            return Err(TrackerError::Fetch(format!("{} returned HTTP {}", self.url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| TrackerError::Fetch(format!("failed to read response body: {}", e)))
    }
}
