use thiserror::Error;

/// Errors returned by a completion provider.
///
/// Authentication and rate-limit failures are separate variants so callers
/// can abort on the former and back off on the latter.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the credentials (HTTP 401/403).
    #[error("provider rejected credentials: {0}")]
    Auth(String),

    /// HTTP 429 from the provider.
    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The caller-supplied deadline elapsed before the provider answered.
    #[error("provider call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The provider answered but the body was not in the expected shape.
    #[error("malformed provider response for {context}: {reason}")]
    MalformedResponse { context: String, reason: String },

    /// The request was rejected before reaching the provider, or the
    /// provider reported it as invalid (HTTP 400/404/422).
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),

    /// Any other non-success status.
    #[error("provider API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    /// Returns `true` for errors worth retrying after a back-off delay.
    ///
    /// **Retryable:** rate limits, timeouts, connect/timeout transport
    /// failures and 5xx API statuses.
    ///
    /// **Not retryable:** auth, malformed responses, invalid requests and
    /// 4xx API statuses. Retrying won't fix them.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::Timeout { .. } => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::Transport(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ProviderError::Auth(_)
            | ProviderError::MalformedResponse { .. }
            | ProviderError::InvalidRequest(_) => false,
        }
    }

    /// Authentication failures are fatal to the whole request.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, ProviderError::Auth(_))
    }
}
