use pulso_core::TableError;
use thiserror::Error;

/// Errors returned by the search client and the reshape pipeline.
#[derive(Debug, Error)]
pub enum TwitterError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429. `reset_at` is the epoch second from `x-rate-limit-reset`, if sent.
    #[error("rate limited by search API (reset at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },

    /// Any other non-2xx status.
    #[error("search API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Bad time bounds; raised before any request is made.
    #[error("invalid time window: {0}")]
    InvalidWindow(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A field could not be converted to its storage type.
    #[error("reshape error in column {column}: {reason}")]
    Reshape { column: String, reason: String },

    #[error(transparent)]
    Table(#[from] TableError),
}
