//! Configuration management for escrowboard
//!
//! Handles loading and validation of escrowboard.toml configuration files.
//!
//! Lookup order: an explicit path, then `$ESCROWBOARD_CONFIG`, then
//! `<config_dir>/escrowboard/escrowboard.toml`, then built-in defaults.
//! Environment overrides are applied on top of whatever was loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::allocator::AllocatorConfig;
use crate::error::ConfigError;
use crate::logging::LogConfig;

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "ESCROWBOARD_CONFIG";
/// Environment variable overriding `[api].base_url`.
pub const API_URL_ENV: &str = "ESCROWBOARD_API_URL";
/// Environment variable that disables the remote funds series when truthy.
pub const DISABLE_FUNDS_FETCH_ENV: &str = "ESCROWBOARD_DISABLE_FUNDS_FETCH";

const CONFIG_FILE_NAME: &str = "escrowboard.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Synthetic series parameters
    #[serde(default)]
    pub allocator: AllocatorConfig,
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Optional log file, in addition to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whether the funds chart asks the API for a live series
    #[serde(default)]
    pub fetch_enabled: bool,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fetch_enabled: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for terminals
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "unknown log format: {s}. Expected one of: pretty, json"
            )),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default locations when
    /// `path` is `None`. Environment overrides are applied and the result is
    /// validated.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_from(&path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load_from(&path)?,
                None => {
                    tracing::debug!("No config file found; using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let shown = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(shown).into());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(shown.clone(), e.to_string()))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %shown, "Loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeFailed(e.to_string()))
    }

    /// `<config_dir>/escrowboard/escrowboard.toml`, when the platform has a
    /// config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("escrowboard").join(CONFIG_FILE_NAME))
    }

    /// Apply `ESCROWBOARD_API_URL` and `ESCROWBOARD_DISABLE_FUNDS_FETCH`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply environment-style overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.to_string();
            }
        }

        if let Some(raw) = lookup(DISABLE_FUNDS_FETCH_ENV) {
            match parse_flag(&raw) {
                Some(disabled) => self.api.fetch_enabled = !disabled,
                None => tracing::warn!(
                    var = DISABLE_FUNDS_FETCH_ENV,
                    value = %raw,
                    "Ignoring unrecognized boolean"
                ),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::logging::parse_level(&self.general.log_level)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "api.base_url {:?} is not a valid URL: {e}",
                self.api.base_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url {:?} must use http or https",
                self.api.base_url
            )));
        }
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_ms must be at least 1".to_string(),
            ));
        }

        self.allocator.validate()
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.general.log_level.clone(),
            format: self.general.log_format,
            file: self.general.log_file.clone(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
