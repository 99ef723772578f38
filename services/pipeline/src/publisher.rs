//! Social platform publisher client.
//!
//! This module provides the trait seam the pipeline publishes through plus an
//! HTTP implementation against the platform's REST API. Media uploads carry
//! the file bytes base64-encoded in a JSON body; posts reference previously
//! uploaded media ids.

use crate::config::PublisherConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

/// One media item attached to an existing post.
#[derive(Debug, Clone)]
pub struct AttachedMedia {
    /// Platform media id
    pub id: String,
    /// Direct image URL
    pub url: String,
}

/// The subset of a fetched post the pipeline cares about.
#[derive(Debug, Clone, Default)]
pub struct PostInfo {
    pub attached_media: Vec<AttachedMedia>,
}

/// Client trait for the external publisher API.
#[async_trait]
pub trait PublisherClient: Send + Sync {
    /// Upload media bytes, returning the platform's media reference id.
    async fn upload_media(&self, bytes: &[u8]) -> Result<String, PipelineError>;

    /// Attach alt-text metadata to an uploaded media id.
    async fn attach_metadata(&self, media_id: &str, alt_text: &str) -> Result<(), PipelineError>;

    /// Publish a post referencing uploaded media, optionally as a reply.
    async fn publish(
        &self,
        text: &str,
        media_ids: &[String],
        reply_to: Option<&str>,
    ) -> Result<String, PipelineError>;

    /// Fetch an existing post and its attached media.
    async fn fetch_post(&self, post_id: &str) -> Result<PostInfo, PipelineError>;

    /// Register a webhook callback URL for mention events.
    async fn subscribe_webhook(&self, callback_url: &str) -> Result<(), PipelineError>;
}

// Wire formats of the publisher REST API.

#[derive(Debug, Deserialize)]
struct UploadResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id_str: String,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    entities: ShowEntities,
}

#[derive(Debug, Default, Deserialize)]
struct ShowEntities {
    #[serde(default)]
    media: Vec<ShowMedia>,
}

#[derive(Debug, Deserialize)]
struct ShowMedia {
    id_str: String,
    media_url_https: String,
}

/// HTTP publisher backed by reqwest.
pub struct HttpPublisher {
    client: reqwest::Client,
    config: PublisherConfig,
}

impl HttpPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::transport("client setup", e))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        context: &'static str,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T, PipelineError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::transport(context, e))?;

        response
            .json::<T>()
            .await
            .map_err(|e| PipelineError::transport(context, e))
    }
}

#[async_trait]
impl PublisherClient for HttpPublisher {
    #[instrument(skip(self, bytes), fields(size_bytes = bytes.len()))]
    async fn upload_media(&self, bytes: &[u8]) -> Result<String, PipelineError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let response: UploadResponse = self
            .post_json(
                "media upload",
                &self.config.upload_endpoint(),
                json!({ "media": encoded }),
            )
            .await?;

        debug!(media_id = %response.media_id_string, "Media uploaded");
        Ok(response.media_id_string)
    }

    #[instrument(skip(self, alt_text))]
    async fn attach_metadata(&self, media_id: &str, alt_text: &str) -> Result<(), PipelineError> {
        let url = self.endpoint("media/metadata/create");
        let body = json!({
            "media_id": media_id,
            "alt_text": { "text": alt_text },
        });

        self.client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::transport("metadata create", e))?;

        Ok(())
    }

    #[instrument(skip(self, text, media_ids), fields(media_count = media_ids.len()))]
    async fn publish(
        &self,
        text: &str,
        media_ids: &[String],
        reply_to: Option<&str>,
    ) -> Result<String, PipelineError> {
        let mut body = json!({
            "status": text,
            "media_ids": media_ids,
        });
        if let Some(parent) = reply_to {
            body["in_reply_to_status_id"] = json!(parent);
        }

        let response: PublishResponse = self
            .post_json("status update", &self.endpoint("statuses/update"), body)
            .await?;

        info!(post_id = %response.id_str, "Post published");
        Ok(response.id_str)
    }

    #[instrument(skip(self))]
    async fn fetch_post(&self, post_id: &str) -> Result<PostInfo, PipelineError> {
        let url = self.endpoint(&format!("statuses/show/{post_id}"));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::transport("post lookup", e))?;

        let show: ShowResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::transport("post lookup", e))?;

        Ok(PostInfo {
            attached_media: show
                .entities
                .media
                .into_iter()
                .map(|m| AttachedMedia {
                    id: m.id_str,
                    url: m.media_url_https,
                })
                .collect(),
        })
    }

    #[instrument(skip(self))]
    async fn subscribe_webhook(&self, callback_url: &str) -> Result<(), PipelineError> {
        self.client
            .post(self.endpoint("webhooks"))
            .bearer_auth(&self.config.token)
            .json(&json!({ "url": callback_url }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::transport("webhook subscribe", e))?;

        info!(callback_url, "Webhook subscription registered");
        Ok(())
    }
}
