//! Application configuration
//!
//! One JSON file, loaded once at startup, read-only thereafter. The refresh
//! interval drives the cache freshness policy; the API base URL and app id
//! are passed explicitly to the components that need them rather than read
//! from ambient state. Nothing in the crate can perform a freshness check
//! before this file has been loaded, because the gateway takes the interval
//! at construction.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Default OpenWeatherMap API base
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Config file name under the XDG config directory
const CONFIG_FILE: &str = "config.json";

/// Errors that can occur loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for the expected shape
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is empty
    #[error("config field '{0}' must not be empty")]
    MissingField(&'static str),

    /// The platform config directory could not be determined
    #[error("could not determine config directory")]
    NoDirectory,
}

/// API endpoint settings handed to [`WeatherApi`](crate::conditions::WeatherApi)
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub app_id: String,
}

impl ApiConfig {
    /// Fails if either field is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::MissingField("base_url"));
        }
        if self.app_id.is_empty() {
            return Err(ConfigError::MissingField("app_id"));
        }
        Ok(())
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Minutes a cached response stays fresh
    pub refresh_interval_minutes: i64,
    /// API base URL; defaults to the public OpenWeatherMap endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key; required, no default
    pub app_id: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl AppConfig {
    /// Loads and validates the config file at `path`
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Self::from_json(&contents)
    }

    /// Parses and validates config from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(contents)?;
        config.api().validate()?;
        Ok(config)
    }

    /// The API settings slice of this config
    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            app_id: self.app_id.clone(),
        }
    }

    /// Default config file location (`~/.config/zipweather/config.json` on Linux)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let project_dirs = ProjectDirs::from("", "", "zipweather").ok_or(ConfigError::NoDirectory)?;
        Ok(project_dirs.config_dir().join(CONFIG_FILE))
    }
}
