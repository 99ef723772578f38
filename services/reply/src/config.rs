//! Configuration management for the reply service.

use config::{Config, ConfigError, Environment, File};
use huebot_pipeline::{ArtifactConfig, PaletteConfig, PublisherConfig};
use serde::Deserialize;

/// Main configuration for the reply service.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyConfig {
    /// Webhook listener configuration
    pub webhook: WebhookConfig,

    /// Publisher API configuration
    pub publisher: PublisherConfig,

    /// Palette extraction and layout configuration
    pub palette: PaletteConfig,

    /// Local artifact storage
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Webhook listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Exact mention text that triggers a run; everything else is ignored
    pub mention: String,

    /// Publicly reachable callback URL registered with the publisher at
    /// startup; skipped when unset (e.g. behind an existing subscription)
    #[serde(default)]
    pub callback_url: Option<String>,
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
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5555
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ReplyConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default config file (config/default.toml)
    /// 2. Environment-specific config (config/{env}.toml)
    /// 3. Environment variables (prefixed with REPLY_)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("REPLY")
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
                Environment::with_prefix("REPLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.webhook.mention.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "webhook.mention".to_string(),
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

        let layout = &self.palette.layout;
        if layout.width == 0 || layout.height == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "palette.layout.width/height".to_string(),
                message: "Dimensions must be greater than 0".to_string(),
            });
        }
        if layout.cell_count() == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "palette.layout.rows/columns".to_string(),
                message: "Layout needs at least one cell".to_string(),
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
