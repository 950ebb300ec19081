#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Application configuration.
//!
//! Values come from an optional TOML file (`POLICE_PERF_CONFIG`, falling
//! back to `./police_perf.toml`) and are then overridden by environment
//! variables: `DATABASE_PATH`, `BIND_ADDR`, `PORT`, `AI_PROVIDER`,
//! `AI_MODEL`, and `AI_BASE_URL`.
//!
//! ```toml
//! database_path = "data/police_perf.db"
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [ai]
//! provider = "gemini"
//! model = "gemini-2.5-flash"
//! ```

use std::path::{Path, PathBuf};

use police_perf_ai::providers::ProviderSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "POLICE_PERF_CONFIG";

/// Config file read when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "police_perf.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AppConfig`].
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override has the wrong type.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// AI provider selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// `gemini`, `anthropic`, or `openai`. Auto-detected when unset.
    pub provider: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Base URL for `OpenAI`-compatible servers.
    pub base_url: Option<String>,
}

impl From<&AiConfig> for ProviderSettings {
    fn from(config: &AiConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `SQLite` file holding performance records.
    pub database_path: PathBuf,
    /// HTTP bind address.
    pub bind_addr: String,
    /// HTTP port.
    pub port: u16,
    /// AI provider settings.
    pub ai: AiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/police_perf.db"),
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            ai: AiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config file (if any) and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or invalid, or an
    /// override cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if explicit.is_some() || path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Reads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Self::from_toml(&text)
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is invalid.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies overrides looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `PORT` is not a port number.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = var("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(addr) = var("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(port) = var("PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value: port,
            })?;
        }
        if let Some(provider) = var("AI_PROVIDER") {
            self.ai.provider = Some(provider);
        }
        if let Some(model) = var("AI_MODEL") {
            self.ai.model = Some(model);
        }
        if let Some(base_url) = var("AI_BASE_URL") {
            self.ai.base_url = Some(base_url);
        }
        Ok(())
    }

    /// Provider settings for the reporter.
    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings::from(&self.ai)
    }
}
