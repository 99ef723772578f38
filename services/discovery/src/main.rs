//! Discovery service for the huebot palette bot.
//!
//! One-shot run meant to be scheduled externally (e.g. cron): picks a random
//! movie no earlier run has posted, publishes its poster next to the poster's
//! color palette, and records the movie id. Exits 0 after a successful
//! publish, non-zero on any failure.
//!
//! # Architecture
//!
//! ```text
//! Metadata API -> SourceSelector -> PublishPipeline -> Publisher API
//!                                        |
//!                                  UsedIdRegistry
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from:
//! 1. Configuration files (config/default.toml, config/{env}.toml)
//! 2. Environment variables (prefixed with DISCOVERY_)
//!
//! See `config.rs` for detailed configuration options.

mod config;

use anyhow::{Context, Result};
use config::DiscoveryConfig;
use huebot_pipeline::{
    ColorThiefExtractor, HttpFetcher, HttpMetadata, HttpPublisher, PipelineConfig,
    PublishPipeline, RandomSampler, RunReport, UsedIdRegistry,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = load_config()?;

    // Initialize logging
    init_tracing(&config.logging);

    info!(
        service = "huebot-discovery",
        version = env!("CARGO_PKG_VERSION"),
        "Starting discovery run"
    );

    // Validate configuration
    config.validate()?;

    // Durable de-duplication state, read once per run
    let mut registry = UsedIdRegistry::load(&config.registry.path)
        .context("Failed to load used-id registry")?;
    info!(
        used_ids = registry.len(),
        path = %config.registry.path.display(),
        "Registry loaded"
    );

    // Build clients and pipeline
    let metadata =
        HttpMetadata::new(&config.metadata).context("Failed to create metadata client")?;
    let publisher = Arc::new(
        HttpPublisher::new(&config.publisher).context("Failed to create publisher client")?,
    );
    let fetcher = Arc::new(
        HttpFetcher::new(config.publisher.request_timeout())
            .context("Failed to create media fetcher")?,
    );
    let extractor = Arc::new(ColorThiefExtractor::new(config.palette.quality));

    let pipeline = PublishPipeline::new(
        publisher,
        fetcher,
        extractor,
        PipelineConfig {
            palette: config.palette.clone(),
            artifacts: config.artifacts.clone(),
            max_transient_retries: config.publisher.max_transient_retries,
        },
    );

    // Run one pipeline instance to completion
    let mut sampler = RandomSampler;
    let report = pipeline
        .run_discovery(&metadata, &mut registry, &mut sampler, &config.selection)
        .await
        .context("Discovery run failed")?;

    match report {
        RunReport::Published { post_id, source_id } => {
            info!(post_id = %post_id, movie_id = %source_id, "Discovery run published");
        }
        RunReport::Skipped => {
            // Discovery selection either publishes or errors; kept for completeness.
            info!("Discovery run finished without publishing");
        }
    }

    Ok(())
}

/// Load and validate configuration.
fn load_config() -> Result<DiscoveryConfig> {
    let config = DiscoveryConfig::load().or_else(|e| {
        eprintln!("Failed to load config from files ({e}), trying environment");
        DiscoveryConfig::from_env()
    })?;

    Ok(config)
}

/// Initialize tracing/logging.
fn init_tracing(config: &config::LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}
