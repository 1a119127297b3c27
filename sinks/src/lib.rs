//! Classification sinks
//!
//! Downstream services that accept free text and either route it
//! (`notebook`, LLM classification into investment-theme notebooks) or
//! store it (`bucketeer`, the vector-bucket content store).

pub mod bucketeer;
pub mod notebook;

pub use bucketeer::{BucketeerClient, StoredContent};
pub use notebook::{NotebookRouter, RouteOutcome, SourceRequest};

/// Errors shared by the sinks
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The caller's input could not be used
    #[error("{0}")]
    InvalidInput(String),

    /// A required key or credential is missing from the configuration
    #[error("{0}")]
    NotConfigured(String),

    /// The sink did not answer within the retry budget
    #[error("{0}")]
    Timeout(String),

    /// The sink answered with an unexpected status
    #[error("sink error ({status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SinkError>;
