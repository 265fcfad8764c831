//! Configuration management for credfetch
//!
//! This module provides configuration loading with multi-source precedence
//! and zero-config defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, DownloadOptions, OnFailure, ResultRenderer};
use crate::auth::{CredentialManager, CredentialStore};
use crate::constants::files;
use crate::errors::{ConfigError, ConfigResult, CredentialResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfig,
    /// Download defaults
    pub download: DownloadConfig,
    /// Credential store settings
    pub credentials: CredentialsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Download defaults, overridable per call
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DownloadConfig {
    /// Failure handling
    pub on_failure: OnFailure,
    /// Result rendering
    pub result_renderer: ResultRenderer,
    /// Overwrite existing destinations
    pub force: bool,
    /// Root directory for downloads (empty = current directory)
    pub destination_root: Option<PathBuf>,
}

/// Credential store settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Credential store file; falls back to `CREDFETCH_CREDENTIAL_STORE`
    /// and then to the user config directory
    pub store_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit, project-local or user config)
    /// 3. CLI arguments (applied by the caller)
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file()?,
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> ConfigResult<Option<PathBuf>> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Ok(user_config) = Self::default_config_path() {
            search_paths.push(user_config);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Ok(Some(path));
            }
        }

        debug!("No config file found in standard locations");
        Ok(None)
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(files::APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Reject values that cannot work at runtime
    pub fn validate(&self) -> ConfigResult<()> {
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Rate limit must be greater than zero".to_string(),
            });
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            });
        }

        Ok(())
    }

    /// Credential manager for the configured store location
    pub fn credential_manager(&self) -> CredentialResult<CredentialManager> {
        let path = match &self.credentials.store_path {
            Some(path) => path.clone(),
            None => CredentialStore::default_path()?,
        };
        debug!("Using credential store: {}", path.display());
        Ok(CredentialManager::with_store_path(path))
    }

    /// Download options seeded from the configured defaults
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            credential: None,
            on_failure: self.download.on_failure,
            result_renderer: self.download.result_renderer,
            force: self.download.force,
            destination_root: self.download.destination_root.clone(),
        }
    }
}
