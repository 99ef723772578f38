//! Source image byte fetching.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Capability seam for fetching raw image bytes from a URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::transport("client setup", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::transport("image fetch", e))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::transport("image fetch", e))?;

        debug!(url, size_bytes = bytes.len(), "Fetched source image");
        Ok(bytes.to_vec())
    }
}
