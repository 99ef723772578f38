//! Configuration types shared by the huebot services.
//!
//! Each service composes these sections into its own top-level config struct
//! and loads them through the `config` crate (files plus environment
//! overrides); the types here only describe the shape and defaults.

use crate::render::GridLayout;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Social platform publisher API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    /// Base URL of the publisher REST API
    pub base_url: String,

    /// Media upload endpoint; defaults to `{base_url}/media/upload`
    #[serde(default)]
    pub upload_url: Option<String>,

    /// Bearer token for API authentication
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum retries for a transient media upload failure
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,
}

/// Movie metadata API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// Base URL of the metadata REST API
    pub base_url: String,

    /// API key sent as a query parameter
    pub api_key: String,

    /// Base URL prepended to relative poster paths
    pub image_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Palette extraction and layout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteConfig {
    /// Grid layout for the rendered palette image; the cell count also fixes
    /// the number of colors requested from the quantizer
    pub layout: GridLayout,

    /// Quantizer quality, 1 (best) to 10 (fastest)
    #[serde(default = "default_quality")]
    pub quality: u8,
}

/// Candidate movie selection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// Maximum candidate draws before giving up with an exhaustion error
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before redrawing after a candidate without a usable poster
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Lowest movie id considered by the random draw
    #[serde(default = "default_min_id")]
    pub min_id: u64,
}

/// Local artifact storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Directory for per-run poster and palette files
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

// Default value functions
fn default_request_timeout() -> u64 {
    60
}
fn default_max_transient_retries() -> u32 {
    3
}
fn default_quality() -> u8 {
    10
}
fn default_max_attempts() -> u32 {
    50
}
fn default_retry_delay_secs() -> u64 {
    2
}
fn default_min_id() -> u64 {
    10
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

impl PublisherConfig {
    /// Get the request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the media upload endpoint.
    pub fn upload_endpoint(&self) -> String {
        self.upload_url
            .clone()
            .unwrap_or_else(|| format!("{}/media/upload", self.base_url))
    }
}

impl MetadataConfig {
    /// Get the request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SelectionConfig {
    /// Get the redraw delay as Duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            min_id: default_min_id(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_endpoint_defaults_to_base_url() {
        let config = PublisherConfig {
            base_url: "https://api.example.com/1.1".to_string(),
            upload_url: None,
            token: "secret".to_string(),
            request_timeout_secs: 60,
            max_transient_retries: 3,
        };
        assert_eq!(
            config.upload_endpoint(),
            "https://api.example.com/1.1/media/upload"
        );
    }

    #[test]
    fn test_explicit_upload_endpoint_wins() {
        let config = PublisherConfig {
            base_url: "https://api.example.com/1.1".to_string(),
            upload_url: Some("https://upload.example.com/media".to_string()),
            token: "secret".to_string(),
            request_timeout_secs: 60,
            max_transient_retries: 3,
        };
        assert_eq!(config.upload_endpoint(), "https://upload.example.com/media");
    }

    #[test]
    fn test_selection_defaults() {
        let selection = SelectionConfig::default();
        assert_eq!(selection.max_attempts, 50);
        assert_eq!(selection.retry_delay(), Duration::from_secs(2));
        assert_eq!(selection.min_id, 10);
    }
}
