use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// CDN prefix used by the builtin catalog.
pub const DEFAULT_CDN_BASE: &str = "https://cdn.jsdelivr.net/npm";

/// Tracing filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Top-level configuration for the resource loader.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Prefix joined to every location that is not already absolute.
    pub base_url: Option<String>,
    /// Replacement fetch locations keyed by resource id (e.g. a local mirror).
    pub location_overrides: HashMap<String, Vec<String>>,
    /// Extra headers sent with every fetch.
    pub headers: HashMap<String, String>,
    /// Per-request HTTP timeout. Unset means fetches may wait indefinitely.
    pub fetch_timeout_ms: Option<u64>,
    /// Resource ids requested as soon as the loader is initialized.
    pub preload: Vec<String>,
}

impl LoaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid loader config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading loader config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Resolve a location against `base_url`. Absolute URLs pass through.
    pub fn resolve_location(&self, location: &str) -> String {
        if location.contains("://") {
            return location.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                location.trim_start_matches('/')
            ),
            None => location.to_string(),
        }
    }
}
