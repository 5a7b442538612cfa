//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration that fetches the public NASA ISS feed and reverse
//! geocodes through OpenStreetMap's Nominatim.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:5000"
//!
//! [upstream]
//! url = "https://nasa-public-data.s3.amazonaws.com/iss-coords/current/ISS_OEM/ISS.OEM_J2K_EPH.xml"
//! timeout_secs = 30
//!
//! [geocode]
//! enabled = true
//! base_url = "https://nominatim.openstreetmap.org"
//! user_agent = "iss_tracker"
//! zoom = 10
//! language = "en"
//! timeout_secs = 10
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub geocode: GeocodeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub url: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

fn default_upstream_url() -> String {
    "https://nasa-public-data.s3.amazonaws.com/iss-coords/current/ISS_OEM/ISS.OEM_J2K_EPH.xml"
        .to_string()
}
fn default_upstream_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_geocode_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_geocode_url(),
            user_agent: default_user_agent(),
            zoom: default_zoom(),
            language: default_language(),
            timeout_secs: default_geocode_timeout(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_user_agent() -> String {
    "iss_tracker".to_string()
}
fn default_zoom() -> u8 {
    10
}
fn default_language() -> String {
    "en".to_string()
}
fn default_geocode_timeout() -> u64 {
    10
}

impl Config {
    /// All-defaults configuration, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind must not be empty");
        }

        check_url("upstream.url", &self.upstream.url)?;
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be > 0");
        }

        if self.geocode.enabled {
            check_url("geocode.base_url", &self.geocode.base_url)?;
            if self.geocode.timeout_secs == 0 {
                anyhow::bail!("geocode.timeout_secs must be > 0");
            }
            if self.geocode.zoom > 18 {
                anyhow::bail!("geocode.zoom must be in [0, 18]");
            }
            if self.geocode.user_agent.trim().is_empty() {
                anyhow::bail!("geocode.user_agent must not be empty");
            }
        }

        Ok(())
    }
}

fn check_url(field: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("{} must be an http:// or https:// URL, got '{}'", field, url);
    }
    Ok(())
}

/// Reads and validates a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but falls back to [`Config::minimal`] when the file
/// does not exist. A file that exists but is invalid is still an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::minimal());
    }
    load_config(path)
}
