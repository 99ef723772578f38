//! Configuration management for the discovery service.

use config::{Config, ConfigError, Environment, File};
use huebot_pipeline::{
    ArtifactConfig, MetadataConfig, PaletteConfig, PublisherConfig, SelectionConfig,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration for the discovery service.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Movie metadata API configuration
    pub metadata: MetadataConfig,

    /// Publisher API configuration
    pub publisher: PublisherConfig,

    /// Palette extraction and layout configuration
    pub palette: PaletteConfig,

    /// Candidate movie selection
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Used-id registry file
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Local artifact storage
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Used-id registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Path of the JSON used-id file
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_registry_path() -> PathBuf {
    PathBuf::from("./used-ids.json")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default config file (config/default.toml)
    /// 2. Environment-specific config (config/{env}.toml)
    /// 3. Environment variables (prefixed with DISCOVERY_)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("DISCOVERY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Create configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("DISCOVERY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.metadata.base_url.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "metadata.base_url".to_string(),
            ));
        }
        if self.metadata.api_key.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "metadata.api_key".to_string(),
            ));
        }
        if self.publisher.base_url.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "publisher.base_url".to_string(),
            ));
        }
        if self.publisher.token.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "publisher.token".to_string(),
            ));
        }

        if self.selection.max_attempts == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "selection.max_attempts".to_string(),
                message: "At least one attempt is required".to_string(),
            });
        }

        let layout = &self.palette.layout;
        if layout.width == 0 || layout.height == 0 || layout.cell_count() == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "palette.layout".to_string(),
                message: "Layout needs positive dimensions and at least one cell".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use huebot_pipeline::GridLayout;

    fn create_test_config() -> DiscoveryConfig {
        DiscoveryConfig {
            metadata: MetadataConfig {
                base_url: "https://api.moviedata.example.com/3".to_string(),
                api_key: "key".to_string(),
                image_base_url: "https://images.moviedata.example.com/w500".to_string(),
                request_timeout_secs: 60,
            },
            publisher: PublisherConfig {
                base_url: "https://api.example.com/1.1".to_string(),
                upload_url: None,
                token: "secret".to_string(),
                request_timeout_secs: 60,
                max_transient_retries: 3,
            },
            palette: PaletteConfig {
                layout: GridLayout::discovery_grid(),
                quality: 10,
            },
            selection: SelectionConfig::default(),
            registry: RegistryConfig::default(),
            artifacts: ArtifactConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = create_test_config();
        config.metadata.api_key = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_zero_attempts() {
        let mut config = create_test_config();
        config.selection.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidValue { .. })
        ));
    }
}
