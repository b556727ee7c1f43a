// Application configuration: file, environment and validation

use nutrilens_cloud::CloudConfig;
use nutrilens_eye::DetectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub cloud: CloudConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// JSON or TOML, detected by trying each.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        if let Ok(config) = serde_json::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        toml::from_str::<AppConfig>(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults with `NUTRILENS_*` overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load `path` when given (defaults otherwise), then apply the
    /// environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => return Self::from_env(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `NUTRILENS_MODEL_PATH`, `NUTRILENS_CLOUD_ENDPOINT`,
    /// `NUTRILENS_LOG_LEVEL` and `NUTRILENS_CONFIDENCE`.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("NUTRILENS_MODEL_PATH") {
            self.detection.model_path = PathBuf::from(path);
        }

        if let Some(endpoint) = var("NUTRILENS_CLOUD_ENDPOINT") {
            self.cloud.endpoint = endpoint;
        }

        if let Some(level) = var("NUTRILENS_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(confidence) = var("NUTRILENS_CONFIDENCE") {
            self.detection.confidence_threshold = confidence.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("NUTRILENS_CONFIDENCE is not a number: {}", confidence))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection
            .validate()
            .map_err(|e| ConfigError::Validation(format!("detection: {}", e)))?;
        self.cloud
            .validate()
            .map_err(|e| ConfigError::Validation(format!("cloud: {}", e)))?;

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
