//! Source image selection for both trigger variants.
//!
//! Variant A resolves the poster from the post a mention replied to; variant
//! B draws pseudo-random movie ids from the metadata service until it finds
//! one with a usable poster that no earlier run has posted. The draw loop is
//! iterative and bounded; running out of attempts is a distinct error rather
//! than an endless search.

use crate::config::SelectionConfig;
use crate::error::PipelineError;
use crate::metadata::MetadataClient;
use crate::publisher::PublisherClient;
use crate::registry::UsedIdRegistry;
use rand::Rng;
use tracing::{debug, info, warn};

/// The image one pipeline run will extract a palette from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Opaque source identifier (media id for replies, movie id for discovery)
    pub id: String,
    /// Direct image URL
    pub url: String,
    pub title: Option<String>,
    pub year: Option<String>,
}

/// Candidate id draw, injected so tests can script the sequence.
pub trait IdSampler: Send {
    /// Draw an id uniformly from `[lo, hi)`.
    fn sample(&mut self, lo: u64, hi: u64) -> u64;
}

/// Production sampler backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct RandomSampler;

impl IdSampler for RandomSampler {
    fn sample(&mut self, lo: u64, hi: u64) -> u64 {
        rand::rng().random_range(lo..hi)
    }
}

/// Resolve the source image from a reply trigger (variant A).
///
/// Returns `Ok(None)` when the parent post has no attached media; the run is
/// abandoned silently in that case, with nothing posted and nothing created.
pub async fn resolve_from_trigger(
    publisher: &dyn PublisherClient,
    parent_post_id: &str,
) -> Result<Option<SourceImage>, PipelineError> {
    let post = publisher.fetch_post(parent_post_id).await?;

    match post.attached_media.into_iter().next() {
        Some(media) => {
            debug!(parent_post_id, media_id = %media.id, "Resolved source from trigger");
            Ok(Some(SourceImage {
                id: media.id,
                url: media.url,
                title: None,
                year: None,
            }))
        }
        None => {
            info!(parent_post_id, "Parent post has no media, abandoning run");
            Ok(None)
        }
    }
}

/// Pick a pseudo-random unused movie (variant B).
pub async fn select_unused_movie(
    metadata: &dyn MetadataClient,
    registry: &UsedIdRegistry,
    sampler: &mut dyn IdSampler,
    opts: &SelectionConfig,
) -> Result<SourceImage, PipelineError> {
    let latest = metadata.latest_id().await?;

    // An empty draw range means the id space below `latest` is off limits
    // entirely; surface that instead of letting the sampler panic.
    if latest <= opts.min_id {
        return Err(PipelineError::State(format!(
            "latest movie id {latest} leaves no candidates at or above min id {}",
            opts.min_id
        )));
    }

    for attempt in 1..=opts.max_attempts {
        let candidate = sampler.sample(opts.min_id, latest);

        if registry.contains(candidate) {
            debug!(candidate, attempt, "Candidate already used, redrawing");
            continue;
        }

        let movie = metadata.movie(candidate).await?;
        match movie.poster_url {
            Some(url) if !movie.adult => {
                info!(movie_id = movie.id, title = %movie.title, attempt, "Selected movie");
                return Ok(SourceImage {
                    id: movie.id.to_string(),
                    url,
                    year: movie.release_date.map(|d| d.chars().take(4).collect()),
                    title: Some(movie.title),
                });
            }
            _ => {
                warn!(candidate, attempt, "Candidate has no usable poster, redrawing");
                tokio::time::sleep(opts.retry_delay()).await;
            }
        }
    }

    Err(PipelineError::Exhausted {
        attempts: opts.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MovieRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedSampler {
        draws: Vec<u64>,
        next: usize,
    }

    impl ScriptedSampler {
        fn new(draws: Vec<u64>) -> Self {
            Self { draws, next: 0 }
        }
    }

    impl IdSampler for ScriptedSampler {
        fn sample(&mut self, _lo: u64, _hi: u64) -> u64 {
            let draw = self.draws[self.next % self.draws.len()];
            self.next += 1;
            draw
        }
    }

    struct FakeMetadata {
        latest: u64,
        movies: HashMap<u64, MovieRecord>,
        lookups: AtomicU32,
    }

    impl FakeMetadata {
        fn new(latest: u64, movies: Vec<MovieRecord>) -> Self {
            Self {
                latest,
                movies: movies.into_iter().map(|m| (m.id, m)).collect(),
                lookups: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl MetadataClient for FakeMetadata {
        async fn latest_id(&self) -> Result<u64, PipelineError> {
            Ok(self.latest)
        }

        async fn movie(&self, id: u64) -> Result<MovieRecord, PipelineError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.movies
                .get(&id)
                .cloned()
                .ok_or_else(|| PipelineError::transport("movie lookup", "not found"))
        }
    }

    fn movie(id: u64, poster: Option<&str>, adult: bool) -> MovieRecord {
        MovieRecord {
            id,
            title: format!("Movie {id}"),
            poster_url: poster.map(String::from),
            adult,
            release_date: Some("1999-10-15".to_string()),
        }
    }

    fn fast_opts(max_attempts: u32) -> SelectionConfig {
        SelectionConfig {
            max_attempts,
            retry_delay_secs: 0,
            min_id: 10,
        }
    }

    #[tokio::test]
    async fn test_used_ids_are_skipped_without_a_lookup() {
        let metadata = FakeMetadata::new(
            20,
            vec![movie(7, Some("https://img.example.com/7.jpg"), false)],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.json");
        std::fs::write(&path, r#"{"ids":[5]}"#).unwrap();
        let registry = UsedIdRegistry::load(&path).unwrap();
        let mut sampler = ScriptedSampler::new(vec![5, 7]);

        let source = select_unused_movie(&metadata, &registry, &mut sampler, &fast_opts(10))
            .await
            .unwrap();

        assert_eq!(source.id, "7");
        assert_eq!(source.year.as_deref(), Some("1999"));
        // Draw of 5 was rejected from the registry before hitting the API.
        assert_eq!(metadata.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_posterless_and_adult_candidates_are_redrawn() {
        let metadata = FakeMetadata::new(
            20,
            vec![
                movie(11, None, false),
                movie(12, Some("https://img.example.com/12.jpg"), true),
                movie(13, Some("https://img.example.com/13.jpg"), false),
            ],
        );
        let registry =
            UsedIdRegistry::load(tempfile::tempdir().unwrap().path().join("used.json")).unwrap();
        let mut sampler = ScriptedSampler::new(vec![11, 12, 13]);

        let source = select_unused_movie(&metadata, &registry, &mut sampler, &fast_opts(10))
            .await
            .unwrap();

        assert_eq!(source.id, "13");
        assert_eq!(source.title.as_deref(), Some("Movie 13"));
    }

    #[tokio::test]
    async fn test_latest_id_at_or_below_min_is_a_typed_error() {
        // A real sampler would panic on an empty range; the guard has to
        // reject the run before any draw happens.
        let metadata = FakeMetadata::new(5, vec![]);
        let registry =
            UsedIdRegistry::load(tempfile::tempdir().unwrap().path().join("used.json")).unwrap();
        let mut sampler = RandomSampler;

        let result = select_unused_movie(&metadata, &registry, &mut sampler, &fast_opts(10)).await;

        assert!(matches!(result, Err(PipelineError::State(_))));
        assert_eq!(metadata.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let metadata = FakeMetadata::new(20, vec![]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.json");
        std::fs::write(&path, r#"{"ids":[5]}"#).unwrap();
        let registry = UsedIdRegistry::load(&path).unwrap();
        let mut sampler = ScriptedSampler::new(vec![5]);

        let result = select_unused_movie(&metadata, &registry, &mut sampler, &fast_opts(3)).await;

        assert!(matches!(
            result,
            Err(PipelineError::Exhausted { attempts: 3 })
        ));
        assert_eq!(metadata.lookups.load(Ordering::SeqCst), 0);
    }
}
