//! Movie metadata API client.

use crate::config::MetadataConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// A movie record with the poster path already resolved to an absolute URL.
#[derive(Debug, Clone)]
pub struct MovieRecord {
    pub id: u64,
    pub title: String,
    /// Absolute poster URL, if the movie has one
    pub poster_url: Option<String>,
    pub adult: bool,
    /// ISO date string such as "1999-10-15", when known
    pub release_date: Option<String>,
}

/// Client trait for the external movie metadata API.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Highest movie id currently known to the service.
    async fn latest_id(&self) -> Result<u64, PipelineError>;

    /// Fetch a single movie record by id.
    async fn movie(&self, id: u64) -> Result<MovieRecord, PipelineError>;
}

// Wire formats of the metadata REST API.

#[derive(Debug, Deserialize)]
struct LatestResponse {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: u64,
    title: String,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    adult: bool,
    #[serde(default)]
    release_date: Option<String>,
}

/// HTTP metadata client backed by reqwest.
pub struct HttpMetadata {
    client: reqwest::Client,
    config: MetadataConfig,
}

impl HttpMetadata {
    pub fn new(config: &MetadataConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::transport("client setup", e))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        context: &'static str,
        path: &str,
    ) -> Result<T, PipelineError> {
        let url = format!("{}/{}", self.config.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
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
impl MetadataClient for HttpMetadata {
    #[instrument(skip(self))]
    async fn latest_id(&self) -> Result<u64, PipelineError> {
        let latest: LatestResponse = self.get_json("latest movie lookup", "movie/latest").await?;
        debug!(latest_id = latest.id, "Fetched latest movie id");
        Ok(latest.id)
    }

    #[instrument(skip(self))]
    async fn movie(&self, id: u64) -> Result<MovieRecord, PipelineError> {
        let movie: MovieResponse = self
            .get_json("movie lookup", &format!("movie/{id}"))
            .await?;

        Ok(MovieRecord {
            id: movie.id,
            title: movie.title,
            poster_url: movie
                .poster_path
                .map(|p| format!("{}{p}", self.config.image_base_url)),
            adult: movie.adult,
            release_date: movie.release_date,
        })
    }
}
