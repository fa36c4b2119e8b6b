use genome_core::ValidationError;
use genome_llm::ProviderError;
use thiserror::Error;

/// Failures that abort a whole analysis run.
///
/// Individual facet failures never surface here; they are recorded on the
/// report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid brand identifier: {0}")]
    InvalidBrand(#[from] ValidationError),

    #[error("provider rejected credentials: {0}")]
    Unauthorized(#[source] ProviderError),
}

/// Errors from fetching a brand website during resolution.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("refusing to fetch non-public host {host}")]
    BlockedHost { host: String },
}
