//! Configuration infrastructure
//!
//! Configuration is organized into two tiers:
//! 1. User-configurable settings (site, account, logging)
//! 2. Advanced settings (transport tuning, config file only)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::domain::constants::geokrety_org;
use crate::infrastructure::http_client::HttpClientConfig;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-configurable settings
    pub user: UserConfig,

    /// Advanced settings (config file only)
    pub advanced: AdvancedConfig,
}

/// User-configurable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Site base URL
    pub base_url: String,

    /// Account login; the password is supplied at runtime, never stored
    pub login: String,

    /// Enable verbose logging
    pub verbose_logging: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            base_url: geokrety_org::BASE_URL.to_string(),
            login: String::new(),
            verbose_logging: false,
            logging: LoggingConfig::default(),
        }
    }
}

/// Advanced transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum requests per second against the site
    pub max_requests_per_second: u32,

    /// Maximum redirects followed on form submissions
    pub max_redirects: usize,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        let transport = HttpClientConfig::default();
        Self {
            user_agent: transport.user_agent,
            timeout_seconds: transport.timeout_seconds,
            max_requests_per_second: transport.max_requests_per_second,
            max_redirects: transport.max_redirects,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level when `RUST_LOG` is not set
    pub level: String,

    /// Also write a log file next to the executable
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_output: true,
        }
    }
}

impl AppConfig {
    /// Transport configuration derived from the advanced tier.
    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            user_agent: self.advanced.user_agent.clone(),
            timeout_seconds: self.advanced.timeout_seconds,
            max_requests_per_second: self.advanced.max_requests_per_second,
            max_redirects: self.advanced.max_redirects,
        }
    }
}

/// Loads and persists the application configuration as JSON.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager over the platform configuration directory.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("no platform configuration directory")?
            .join("geokrety-client");
        Ok(Self {
            config_path: config_dir.join("config.json"),
        })
    }

    /// Manager over an explicit configuration file path.
    #[must_use]
    pub const fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, writing a default file on first run.
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            let config = AppConfig::default();
            self.save_config(&config).await?;
            info!(path = %self.config_path.display(), "created default configuration");
            return Ok(config);
        }
        let raw = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("cannot read {}", self.config_path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid configuration in {}", self.config_path.display()))
    }

    /// Persist the configuration, creating parent directories as needed.
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, raw)
            .await
            .with_context(|| format!("cannot write {}", self.config_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = AppConfig::default();
        let raw = serde_json::to_string(&config).unwrap();
        let restored: AppConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored.user.base_url, geokrety_org::BASE_URL);
        assert_eq!(restored.advanced.timeout_seconds, 30);
    }

    #[tokio::test]
    async fn first_load_creates_a_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.json"));
        let config = manager.load_config().await.unwrap();
        assert!(manager.config_path().exists());
        assert_eq!(config.user.login, "");
    }
}
