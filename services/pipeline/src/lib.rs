//! Huebot Pipeline - shared publishing pipeline for the huebot services
//!
//! This library provides the common machinery for turning a movie poster into
//! a posted color palette. It handles:
//!
//! - Extracting a dominant-color palette from poster image bytes
//! - Rendering the palette as a fixed-layout grid image
//! - Uploading media and publishing posts through the social platform API
//! - Tracking already-used movie ids across scheduled runs
//!
//! # Example
//!
//! ```rust,no_run
//! use huebot_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let publisher_config = PublisherConfig {
//!         base_url: "https://api.example.com/1.1".into(),
//!         upload_url: None,
//!         token: "secret".into(),
//!         request_timeout_secs: 60,
//!         max_transient_retries: 3,
//!     };
//!     let publisher = Arc::new(HttpPublisher::new(&publisher_config)?);
//!     let fetcher = Arc::new(HttpFetcher::new(publisher_config.request_timeout())?);
//!     let extractor = Arc::new(ColorThiefExtractor::default());
//!
//!     let pipeline = PublishPipeline::new(
//!         publisher,
//!         fetcher,
//!         extractor,
//!         PipelineConfig::default(),
//!     );
//!
//!     let report = pipeline.run_reply("100", "alice", "200").await?;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod palette;
pub mod pipeline;
pub mod publisher;
pub mod registry;
pub mod render;
pub mod selector;

// Re-export main types
pub use config::{
    ArtifactConfig, MetadataConfig, PaletteConfig, PublisherConfig, SelectionConfig,
};
pub use error::PipelineError;
pub use fetch::{HttpFetcher, MediaFetcher};
pub use metadata::{HttpMetadata, MetadataClient, MovieRecord};
pub use palette::{ColorThiefExtractor, PaletteExtractor, Rgb};
pub use pipeline::{PipelineConfig, PublishPipeline, RunReport};
pub use publisher::{AttachedMedia, HttpPublisher, PostInfo, PublisherClient};
pub use registry::UsedIdRegistry;
pub use render::{render_palette, GridLayout, RenderError};
pub use selector::{
    resolve_from_trigger, select_unused_movie, IdSampler, RandomSampler, SourceImage,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        ArtifactConfig, MetadataConfig, PaletteConfig, PublisherConfig, SelectionConfig,
    };
    pub use crate::error::PipelineError;
    pub use crate::fetch::{HttpFetcher, MediaFetcher};
    pub use crate::metadata::{HttpMetadata, MetadataClient};
    pub use crate::palette::{ColorThiefExtractor, PaletteExtractor};
    pub use crate::pipeline::{PipelineConfig, PublishPipeline, RunReport};
    pub use crate::publisher::{HttpPublisher, PublisherClient};
    pub use crate::registry::UsedIdRegistry;
    pub use crate::render::GridLayout;
    pub use crate::selector::{IdSampler, RandomSampler, SourceImage};
}
