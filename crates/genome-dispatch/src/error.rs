use std::sync::Arc;

use genome_core::{Report, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    InvalidDestination(#[from] ValidationError),

    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed mail relay response: {0}")]
    Malformed(String),
}

impl DeliveryError {
    /// Whether sending the same message again could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::InvalidDestination(_) => false,
            DeliveryError::Http(e) => e.is_timeout() || e.is_connect(),
            DeliveryError::Rejected { status, .. } => *status == 429 || *status >= 500,
            DeliveryError::Malformed(_) => true,
        }
    }
}

/// A delivery that failed. The report travels back with the error so it
/// can be sent again without recomputing it.
#[derive(Debug, Error)]
#[error("report {} could not be delivered: {error}", report.id)]
pub struct DispatchFailure {
    pub report: Arc<Report>,
    #[source]
    pub error: DeliveryError,
}
