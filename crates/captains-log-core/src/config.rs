//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the server URL, network tuning, cache freshness and the
//! last used login email.
//!
//! Configuration is stored at `~/.config/captains-log/config.json`. A few
//! fields can be overridden from the environment (see [`Config::apply_env`]).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::retry::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS};
use crate::api::{RetryPolicy, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::cache::DEFAULT_STALE_AFTER_MINUTES;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "captains-log";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const ENV_API_URL: &str = "CAPTAINS_LOG_API_URL";

/// Environment variable overriding `last_email`
pub const ENV_EMAIL: &str = "CAPTAINS_LOG_EMAIL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub stale_after_minutes: i64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            stale_after_minutes: DEFAULT_STALE_AFTER_MINUTES,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            debug!(path = %path.display(), "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from the environment using `lookup`.
    /// Takes a lookup function so callers (and tests) choose the source.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(email) = lookup(ENV_EMAIL).filter(|v| !v.is_empty()) {
            self.last_email = Some(email);
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_backoff_ms))
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stale_after_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"apiBaseUrl":"ignored","retry_attempts":5}"#).unwrap();
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn test_apply_env() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            ENV_API_URL => Some("https://log.example.com/api".to_string()),
            ENV_EMAIL => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://log.example.com/api");
        assert_eq!(config.last_email, None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("captains-log-config-{}", std::process::id()))
            .join(CONFIG_FILE);
        let config = Config {
            last_email: Some("skipper@example.com".into()),
            stale_after_minutes: 1,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_derived_settings() {
        let config = Config::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.stale_after(), chrono::Duration::minutes(DEFAULT_STALE_AFTER_MINUTES));
    }
}
