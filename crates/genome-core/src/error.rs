use thiserror::Error;

/// Input rejected before any external call is made. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("brand identifier is empty")]
    EmptyIdentifier,

    #[error("brand identifier must be at least {min} characters")]
    IdentifierTooShort { min: usize },

    #[error("brand identifier must be at most {max} characters")]
    IdentifierTooLong { max: usize },

    #[error("invalid website URL \"{0}\"")]
    InvalidWebsite(String),

    #[error("message text is empty")]
    EmptyMessage,

    #[error("invalid email address \"{0}\"")]
    InvalidEmail(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
