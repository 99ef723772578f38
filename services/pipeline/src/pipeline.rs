//! Publish pipeline orchestration.
//!
//! One pipeline run is all-or-nothing: acquire the source image, extract and
//! render the palette, upload media, publish, then clean up. Any step failure
//! aborts the remaining steps, removes the local artifacts the run created,
//! and leaves the used-id registry untouched. Uploads within a run are
//! dispatched concurrently but publishing waits for every media id, and the
//! id list keeps the original media order because the first id is the one
//! that receives alt-text metadata.

use crate::config::{ArtifactConfig, PaletteConfig, SelectionConfig};
use crate::error::PipelineError;
use crate::fetch::MediaFetcher;
use crate::metadata::MetadataClient;
use crate::palette::PaletteExtractor;
use crate::publisher::PublisherClient;
use crate::registry::UsedIdRegistry;
use crate::render::render_palette;
use crate::selector::{resolve_from_trigger, select_unused_movie, IdSampler, SourceImage};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// What a rendered file on disk is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Poster,
    Palette,
}

/// A file owned by the current run, deleted when the run finishes.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// A post went out
    Published { post_id: String, source_id: String },
    /// The run was abandoned silently (reply trigger without media)
    Skipped,
}

/// Pipeline tuning shared by both trigger variants.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub palette: PaletteConfig,
    pub artifacts: ArtifactConfig,
    /// Maximum retries for a transient media upload failure
    pub max_transient_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            palette: PaletteConfig {
                layout: crate::render::GridLayout::reply_strip(),
                quality: 10,
            },
            artifacts: ArtifactConfig::default(),
            max_transient_retries: 3,
        }
    }
}

/// Orchestrates one source image into one published post.
pub struct PublishPipeline {
    publisher: Arc<dyn PublisherClient>,
    fetcher: Arc<dyn MediaFetcher>,
    extractor: Arc<dyn PaletteExtractor>,
    config: PipelineConfig,
}

impl PublishPipeline {
    pub fn new(
        publisher: Arc<dyn PublisherClient>,
        fetcher: Arc<dyn MediaFetcher>,
        extractor: Arc<dyn PaletteExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            publisher,
            fetcher,
            extractor,
            config,
        }
    }

    /// Run the reply flow: palette of the parent post's image, posted back
    /// at the requester. Returns `Skipped` when the parent carries no media.
    #[instrument(skip(self))]
    pub async fn run_reply(
        &self,
        parent_post_id: &str,
        requester: &str,
        trigger_post_id: &str,
    ) -> Result<RunReport, PipelineError> {
        let Some(source) = resolve_from_trigger(self.publisher.as_ref(), parent_post_id).await?
        else {
            return Ok(RunReport::Skipped);
        };

        let status = format!("@{requester}");
        let post_id = self
            .execute(&source, false, &status, Some(trigger_post_id))
            .await?;

        Ok(RunReport::Published {
            post_id,
            source_id: source.id,
        })
    }

    /// Run the discovery flow: pick an unused movie, post poster plus
    /// palette, and record the movie id once the post is out.
    #[instrument(skip_all)]
    pub async fn run_discovery(
        &self,
        metadata: &dyn MetadataClient,
        registry: &mut UsedIdRegistry,
        sampler: &mut dyn IdSampler,
        selection: &SelectionConfig,
    ) -> Result<RunReport, PipelineError> {
        let source = select_unused_movie(metadata, registry, sampler, selection).await?;

        let status = discovery_status(&source);
        let post_id = self.execute(&source, true, &status, None).await?;

        let movie_id = source
            .id
            .parse::<u64>()
            .map_err(|e| PipelineError::State(format!("non-numeric movie id {}: {e}", source.id)))?;
        registry.commit(movie_id)?;

        Ok(RunReport::Published {
            post_id,
            source_id: source.id,
        })
    }

    /// Shared publish sequence; artifacts are removed on every exit path.
    async fn execute(
        &self,
        source: &SourceImage,
        include_poster: bool,
        status: &str,
        reply_to: Option<&str>,
    ) -> Result<String, PipelineError> {
        let mut artifacts = Vec::new();
        let result = self
            .attempt(source, include_poster, status, reply_to, &mut artifacts)
            .await;
        self.cleanup(&artifacts);
        result
    }

    async fn attempt(
        &self,
        source: &SourceImage,
        include_poster: bool,
        status: &str,
        reply_to: Option<&str>,
        artifacts: &mut Vec<RenderedArtifact>,
    ) -> Result<String, PipelineError> {
        let run_id = Uuid::new_v4();
        let bytes = self.fetcher.fetch(&source.url).await?;

        tokio::fs::create_dir_all(&self.config.artifacts.dir).await?;

        if include_poster {
            let poster_path = self.config.artifacts.dir.join(format!("poster-{run_id}.jpg"));
            tokio::fs::write(&poster_path, &bytes).await?;
            artifacts.push(RenderedArtifact {
                path: poster_path,
                kind: ArtifactKind::Poster,
            });
        }

        let layout = self.config.palette.layout;
        let palette = self.extractor.extract(&bytes, layout.cell_count())?;

        let palette_path = self
            .config
            .artifacts
            .dir
            .join(format!("palette-{run_id}.png"));
        render_palette(&palette, &layout, &palette_path)?;
        artifacts.push(RenderedArtifact {
            path: palette_path,
            kind: ArtifactKind::Palette,
        });

        // Concurrent uploads, order-preserving join: the media id list must
        // match the artifact order because the first id gets the metadata.
        let uploads = artifacts.iter().map(|a| self.upload_with_retry(&a.path));
        let media_ids = future::try_join_all(uploads).await?;

        let alt_text = match &source.title {
            Some(title) => format!("Color palette for {title}"),
            None => "Color palette extracted from the poster".to_string(),
        };
        self.with_retry("metadata create", || {
            self.publisher.attach_metadata(&media_ids[0], &alt_text)
        })
        .await?;

        let post_id = self
            .with_retry("status update", || {
                self.publisher.publish(status, &media_ids, reply_to)
            })
            .await?;

        info!(
            post_id = %post_id,
            source_id = %source.id,
            media_count = media_ids.len(),
            "Pipeline run published"
        );
        Ok(post_id)
    }

    /// Upload one artifact, retrying transient transport failures.
    async fn upload_with_retry(&self, path: &Path) -> Result<String, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.with_retry("media upload", || self.publisher.upload_media(&bytes))
            .await
    }

    /// Run one publisher call with bounded exponential-backoff retries for
    /// transient transport failures.
    async fn with_retry<T, Fut>(
        &self,
        context: &'static str,
        op: impl Fn() -> Fut,
    ) -> Result<T, PipelineError>
    where
        Fut: std::future::Future<Output = Result<T, PipelineError>>,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            max_elapsed_time: None,
            ..Default::default()
        };
        let mut attempt = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_transient_retries => {
                    attempt += 1;
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| Duration::from_secs(8));
                    warn!(
                        context,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn cleanup(&self, artifacts: &[RenderedArtifact]) {
        for artifact in artifacts {
            if let Err(e) = std::fs::remove_file(&artifact.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %artifact.path.display(), error = %e, "Failed to remove artifact");
                }
            }
        }
    }
}

fn discovery_status(source: &SourceImage) -> String {
    match (&source.title, &source.year) {
        (Some(title), Some(year)) => format!("{title} ({year})"),
        (Some(title), None) => title.clone(),
        _ => source.id.clone(),
    }
}
