//! Reply service for the huebot palette bot.
//!
//! Listens for webhook mention events and answers each one with the color
//! palette of the image attached to the post the mention replied to.
//!
//! # Architecture
//!
//! ```text
//! Webhook event -> mention filter -> PublishPipeline -> Publisher API
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from:
//! 1. Configuration files (config/default.toml, config/{env}.toml)
//! 2. Environment variables (prefixed with REPLY_)
//!
//! See `config.rs` for detailed configuration options.

mod config;
mod webhook;

use anyhow::{Context, Result};
use config::ReplyConfig;
use huebot_pipeline::{
    ColorThiefExtractor, HttpFetcher, HttpPublisher, PipelineConfig, PublishPipeline,
    PublisherClient,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use webhook::{create_router, drain_runs, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = load_config()?;

    // Initialize logging
    init_tracing(&config.logging);

    info!(
        service = "huebot-reply",
        version = env!("CARGO_PKG_VERSION"),
        mention = %config.webhook.mention,
        "Starting reply service"
    );

    // Validate configuration
    config.validate()?;

    // Build the publisher client and pipeline
    let publisher = Arc::new(
        HttpPublisher::new(&config.publisher).context("Failed to create publisher client")?,
    );
    let fetcher = Arc::new(
        HttpFetcher::new(config.publisher.request_timeout())
            .context("Failed to create media fetcher")?,
    );
    let extractor = Arc::new(ColorThiefExtractor::new(config.palette.quality));

    let pipeline = Arc::new(PublishPipeline::new(
        publisher.clone(),
        fetcher,
        extractor,
        PipelineConfig {
            palette: config.palette.clone(),
            artifacts: config.artifacts.clone(),
            max_transient_retries: config.publisher.max_transient_retries,
        },
    ));

    // Register the webhook with the publisher
    if let Some(callback_url) = &config.webhook.callback_url {
        publisher
            .subscribe_webhook(callback_url)
            .await
            .context("Failed to register webhook subscription")?;
    } else {
        warn!("No callback URL configured, assuming an existing webhook subscription");
    }

    // Serve the webhook listener
    let runs = Arc::new(Mutex::new(JoinSet::new()));
    let state = AppState {
        pipeline,
        mention: config.webhook.mention.clone(),
        runs: runs.clone(),
    };
    let router = create_router(state);
    let addr = format!("{}:{}", config.webhook.host, config.webhook.port);

    info!(address = %addr, "Listening for webhook events");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook server error")?;

    // Let in-flight reply runs finish before exiting.
    drain_runs(&runs).await;

    info!("Reply service stopped");
    Ok(())
}

/// Load and validate configuration.
fn load_config() -> Result<ReplyConfig> {
    let config = ReplyConfig::load().or_else(|e| {
        eprintln!("Failed to load config from files ({e}), trying environment");
        ReplyConfig::from_env()
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

/// Wait for a shutdown signal.
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for Ctrl+C");
    info!("Received shutdown signal");
}
