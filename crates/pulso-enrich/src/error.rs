use pulso_core::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by language-model API")]
    RateLimited,

    #[error("language-model API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The completion did not parse into the requested fields.
    #[error("malformed classification: {0}")]
    Malformed(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ClassifierError {
    /// Whether the failure belongs to the record being classified rather than
    /// to the service. Record-scoped failures are handled per item by the
    /// batch runner; anything else aborts the run.
    #[must_use]
    pub fn is_record_scoped(&self) -> bool {
        match self {
            ClassifierError::Malformed(_) => true,
            ClassifierError::Api { status, .. } => *status == 400,
            ClassifierError::Http(_)
            | ClassifierError::RateLimited
            | ClassifierError::InvalidBaseUrl { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("classification aborted after {processed} records: {source}")]
    Aborted {
        processed: usize,
        #[source]
        source: ClassifierError,
    },
}
