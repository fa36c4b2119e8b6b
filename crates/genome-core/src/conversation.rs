use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Location of a generated image as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

/// One entry of a conversation. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn assistant_with_image(content: impl Into<String>, image: ImageRef) -> Self {
        Self {
            image: Some(image),
            ..Self::assistant(content)
        }
    }
}

/// Reject blank chat input.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyMessage`] when `text` is empty after trimming.
pub fn validate_message_text(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(trimmed)
}

/// Light structural check of an email address: one `@`, a non-empty local
/// part and a dotted domain, no whitespace.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] when the address fails the check.
pub fn validate_email(address: &str) -> Result<&str, ValidationError> {
    let trimmed = address.trim();
    let invalid = || ValidationError::InvalidEmail(trimmed.to_string());

    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_messages_are_rejected() {
        assert_eq!(
            validate_message_text(""),
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(
            validate_message_text(" \n\t"),
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(validate_message_text("  hi "), Ok("hi"));
    }

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert_eq!(validate_email(" owner@acme.com "), Ok("owner@acme.com"));
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        for bad in ["", "acme.com", "@acme.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            assert!(validate_email(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn assistant_with_image_keeps_reference() {
        let msg = Message::assistant_with_image(
            "here you go",
            ImageRef {
                url: "https://img.example/1.png".to_string(),
                revised_prompt: None,
            },
        );
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(
            msg.image.as_ref().map(|i| i.url.as_str()),
            Some("https://img.example/1.png")
        );
    }
}
