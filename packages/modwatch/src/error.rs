//! Typed errors for the pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Each external concern gets its
//! own enum; `PipelineError` is the umbrella the pipeline surfaces.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream feed fetch failed
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// LLM analysis failed past its retry budget (only surfaced by callers
    /// that bypass the degrade-to-empty contract)
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Notification delivery failed
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Entity with this identifier already exists
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wrap an arbitrary storage backend error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }

    /// Build a not-found error for an entity kind and id.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Build an already-exists error for an entity kind and id.
    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }
}

/// Errors from upstream content sources.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream rejected the request (auth, rate limit, bad id)
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Response body did not have the expected shape
    #[error("malformed feed response: {0}")]
    Malformed(String),

    /// The sheet is missing a required column
    #[error("sheet missing column: {0}")]
    MissingColumn(&'static str),

    /// Source credentials are not configured
    #[error("feed source not configured: {0}")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Errors from a single LLM extraction attempt.
///
/// These are retried internally; after the attempt budget is exhausted the
/// analyzer degrades to an empty result instead of propagating.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The completion API call failed
    #[error("completion error: {0}")]
    Completion(#[from] groq_client::GroqError),

    /// Response was not valid JSON
    #[error("invalid JSON in completion: {0}")]
    Json(#[from] serde_json::Error),

    /// Response parsed but violated the extraction schema
    #[error("schema violation: {0}")]
    Schema(String),
}

/// Errors from the notification sink.
///
/// Delivery failures never roll back registry mutations; they are logged with
/// enough detail to diagnose which capability was missing.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Target channel does not exist or is not visible
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// The sink lacks a delivery capability in the target channel
    #[error("missing capability {capability} in channel {channel}")]
    MissingCapability {
        channel: String,
        capability: &'static str,
    },

    /// Message handle no longer resolves (deleted, archived)
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// Transport-level delivery failure
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for feed source operations.
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Result type alias for single extraction attempts.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Result type alias for notification delivery.
pub type NotifyResult<T> = std::result::Result<T, NotifyError>;
