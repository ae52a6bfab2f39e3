use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sortie_api::NotificationQuery;

pub const ENV_API_URL: &str = "SORTIE_API_URL";
pub const ENV_POLL_INTERVAL: &str = "SORTIE_POLL_INTERVAL";

/// Main configuration structure
///
/// This gets loaded from config file, env vars, and CLI args.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            // No config file? Use defaults
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to disk
    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `SORTIE_*` environment overrides
    pub fn apply_env(&mut self) -> crate::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Same as `apply_env` but with a pluggable lookup, handy in tests
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }

        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            self.polling.interval_secs = raw.trim().parse().map_err(|_| {
                crate::Error::ConfigError(format!(
                    "{} must be a number, got '{}'",
                    ENV_POLL_INTERVAL, raw
                ))
            })?;
        }

        self.validate()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(crate::Error::ConfigError("api.base_url is empty".into()));
        }
        if self.polling.interval_secs == 0 {
            return Err(crate::Error::ConfigError(
                "polling.interval_secs must be at least 1".into(),
            ));
        }
        if self.polling.page_limit == 0 {
            return Err(crate::Error::ConfigError(
                "polling.page_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("sortie");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Backend root, e.g. https://api.sortie.app/api
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Delay between the end of one poll and the start of the next
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Page size requested on every poll
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    #[serde(default = "default_unread_only")]
    pub unread_only: bool,
}

fn default_interval() -> u64 {
    crate::poller::DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_page_limit() -> u32 {
    20
}

fn default_unread_only() -> bool {
    true
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            page_limit: default_page_limit(),
            unread_only: default_unread_only(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Query the poller sends on every tick
    pub fn query(&self) -> NotificationQuery {
        let mut query = NotificationQuery::new();
        if let Some(limit) = NonZeroU32::new(self.page_limit) {
            query = query.limit(limit);
        }
        if !self.unread_only {
            query = query.include_read();
        }
        query
    }
}
