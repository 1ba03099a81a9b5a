use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://bible-api.com";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Longest accepted refresh period (one day)
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;
/// Longest accepted request timeout
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the verse lookup service (the random query is appended)
    pub api_base: String,

    /// Seconds between automatic refreshes
    pub refresh_interval_secs: u64,

    /// Start with auto-refresh enabled
    pub auto_refresh: bool,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            auto_refresh: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("versecard");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Ok(Self::load_from(&path)),
            Err(_) => Ok(AppConfig::default()),
        }
    }

    /// Load config from `path`. A missing or broken file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return AppConfig::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Failed to parse config: {}", e),
            },
            Err(e) => tracing::warn!("Failed to read config: {}", e),
        }

        AppConfig::default()
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Refresh period, between one second and one day
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.clamp(1, MAX_REFRESH_INTERVAL_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.clamp(1, MAX_REQUEST_TIMEOUT_SECS))
    }
}
