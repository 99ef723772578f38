//! Error types shared across the pipeline stages.
//!
//! Every stage returns a typed result instead of terminating the process, so
//! the owning service decides what a failed run means (log and keep listening,
//! or exit non-zero for a scheduled one-shot).

use crate::render::RenderError;
use std::fmt::Display;
use thiserror::Error;

/// Errors that can abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An external API call failed (network, auth, rate limit)
    #[error("transport error during {context}: {message}")]
    Transport {
        context: &'static str,
        message: String,
    },

    /// The source image bytes could not be decoded
    #[error("failed to decode source image: {0}")]
    Decode(String),

    /// The color quantizer rejected the decoded pixels
    #[error("palette extraction failed: {0}")]
    Quantize(String),

    /// Palette rendering failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The candidate search ran out of attempts without an eligible movie
    #[error("no eligible movie found after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// Local artifact or registry I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The durable registry file is malformed
    #[error("registry state error: {0}")]
    State(String),
}

impl PipelineError {
    /// Build a transport error from any displayable cause.
    pub fn transport(context: &'static str, cause: impl Display) -> Self {
        Self::Transport {
            context,
            message: cause.to_string(),
        }
    }

    /// Whether a bounded retry with backoff is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_constructor() {
        let err = PipelineError::transport("media upload", "connection reset");
        assert_eq!(
            err.to_string(),
            "transport error during media upload: connection reset"
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_non_transport_errors_are_not_transient() {
        assert!(!PipelineError::Exhausted { attempts: 50 }.is_transient());
        assert!(!PipelineError::Decode("bad header".to_string()).is_transient());
    }
}
