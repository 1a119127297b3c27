//! Source adapters
//!
//! One module per external service, each translating that HTTP API's
//! response shape into the internal JSON shape the facade and the
//! scheduled agents consume:
//! - `polymarket`: Gamma events/tags search + CLOB price history
//! - `twitter`: COT orchestration runs + fxtwitter post hydration
//! - `youtube`: third-party transcript provider
//! - `reddit`: public JSON API for posts and comments
//!
//! Adapters are deliberately independent of each other; the only shared
//! surface is [`AdapterError`], which carries enough upstream semantics
//! for the facade to pick a response status.

pub mod polymarket;
pub mod reddit;
pub mod twitter;
pub mod youtube;

pub use polymarket::PolymarketClient;
pub use reddit::RedditClient;
pub use twitter::CotClient;
pub use youtube::TranscriptClient;

/// Errors shared by all source adapters
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested resource does not exist upstream
    #[error("{0}")]
    NotFound(String),

    /// Upstream refused access (private/quarantined resources)
    #[error("{0}")]
    Forbidden(String),

    /// The caller's input could not be used
    #[error("{0}")]
    InvalidInput(String),

    /// A required key or credential is missing from the configuration
    #[error("{0}")]
    NotConfigured(String),

    /// Upstream metering rejected the request
    #[error("{0}")]
    QuotaExceeded(String),

    /// Upstream did not answer in time
    #[error("{0}")]
    Timeout(String),

    /// Upstream answered with an unexpected status
    #[error("upstream error ({status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

impl AdapterError {
    /// Classify a transport error, keeping timeouts distinguishable.
    pub fn from_transport(err: reqwest::Error, what: &str) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout(format!("{what} timed out: {err}"))
        } else if err.is_connect() {
            AdapterError::Upstream {
                status: 503,
                detail: format!("{what} unavailable: {err}"),
            }
        } else {
            AdapterError::Http(err)
        }
    }
}
