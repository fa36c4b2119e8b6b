use genome_core::ValidationError;
use genome_llm::ProviderError;
use genome_prompts::TemplateError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("session {0} not found, please restart the conversation")]
    UnknownSession(Uuid),

    #[error("session {0} expired, please restart the conversation")]
    Expired(Uuid),

    #[error("prompt rendering failed: {0}")]
    Template(#[from] TemplateError),

    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
}

impl SessionError {
    /// True when the caller should start a new session rather than retry.
    #[must_use]
    pub fn requires_restart(&self) -> bool {
        matches!(self, SessionError::UnknownSession(_) | SessionError::Expired(_))
    }
}
