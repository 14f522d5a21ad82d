//! Unified error types for linkmirror.
//!
//! Every request-path failure funnels into this enum; the server crate
//! maps variants onto HTTP status codes.

/// Unified error types for the linkmirror pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., missing identifier).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No download control could be located on the rendered page.
    #[error("CONTROL_NOT_FOUND: {0}")]
    ControlNotFound(String),

    /// Browser launch or page navigation failed.
    #[error("NAVIGATION_FAILED: {0}")]
    Navigation(String),

    /// Extraction failed after navigation (interception, evaluation,
    /// body retrieval).
    #[error("EXTRACT_FAILED: {0}")]
    Extraction(String),

    /// The external sync tool exited non-zero at either stage.
    #[error("PUBLISH_FAILED: {0}")]
    Publish(String),

    /// Cache backend failure. Never surfaced to callers; the cache is
    /// an optimization, not a correctness dependency.
    #[error("CACHE_ERROR: {0}")]
    Cache(String),

    /// The overall per-request deadline elapsed.
    #[error("DEADLINE_EXCEEDED: request exceeded {0}ms")]
    DeadlineExceeded(u64),
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Cache(err.to_string())
    }
}
