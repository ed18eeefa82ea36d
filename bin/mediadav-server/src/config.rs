//! Server configuration
//!
//! Settings come from an optional TOML file plus CLI flags and environment
//! variables, with CLI/env taking precedence over the file.

use anyhow::{Context, Result, bail};
use mediadav_vfs::RootLayout;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_refresh_hours() -> f64 {
    1.0
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Immich server base URL, e.g. `https://photos.example.com`
    #[serde(default)]
    pub upstream_url: String,

    /// Immich API key sent as `x-api-key`
    #[serde(default)]
    pub api_key: String,

    /// Listen address for the WebDAV server
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Explicit album IDs to mirror; empty means every album upstream
    /// reports
    #[serde(default)]
    pub album_ids: Vec<String>,

    /// File extensions to hide, matched case-insensitively
    #[serde(default)]
    pub excluded_file_types: Vec<String>,

    /// Hours between metadata refreshes
    #[serde(default = "default_refresh_hours")]
    pub refresh_hours: f64,

    /// Expose assets directly under albums instead of images/videos groups
    #[serde(default)]
    pub flatten: bool,

    /// Root layout of the virtual tree
    #[serde(default)]
    pub layout: RootLayout,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject configurations that cannot possibly serve before touching the
    /// network
    pub fn validate(&self) -> Result<()> {
        if self.upstream_url.trim().is_empty() {
            bail!("upstream_url must be set");
        }
        if !self.upstream_url.starts_with("http://") && !self.upstream_url.starts_with("https://") {
            bail!("upstream_url must be an http(s) URL: {}", self.upstream_url);
        }
        if self.api_key.trim().is_empty() {
            bail!("api_key must be set");
        }
        if !self.refresh_hours.is_finite() || self.refresh_hours <= 0.0 {
            bail!("refresh_hours must be positive: {}", self.refresh_hours);
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_hours * 3600.0)
    }
}

/// Split a comma-delimited flag value, dropping empty pieces
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
