//! Runtime configuration: JSON file (optional) overlaid by environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_BACKEND_URL: &str = "SUBTITLE_MARKER_BACKEND_URL";
pub const ENV_API_TOKEN: &str = "SUBTITLE_MARKER_API_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the backend exposing `/function/run`.
    pub backend_url: String,
    /// Used for this run when the session file holds no token.
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
    pub cache_ttl_secs: u64,
    pub settings_path: PathBuf,
    pub session_path: PathBuf,
    /// IP geolocation endpoint returning `{ "country_code": ... }`.
    pub geo_lookup_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8080".into(),
            api_token: None,
            request_timeout_secs: 30,
            min_request_interval_ms: 100,
            cache_ttl_secs: 24 * 60 * 60,
            settings_path: PathBuf::from("subtitle-marker.settings.json"),
            session_path: PathBuf::from("subtitle-marker.session.json"),
            geo_lookup_url: "https://ipapi.co/json/".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl AppConfig {
    /// Defaults, then the file at `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)?
            }
            None => AppConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.is_empty()) {
            self.api_token = Some(token);
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
