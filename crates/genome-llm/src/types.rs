use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A rendered prompt: optional system instructions plus the user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    #[must_use]
    pub fn new(system: Option<String>, user: impl Into<String>) -> Self {
        Self {
            system,
            user: user.into(),
        }
    }

    #[must_use]
    pub fn user_only(user: impl Into<String>) -> Self {
        Self::new(None, user)
    }

    /// True when there is nothing for the provider to answer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub model: String,
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Ask the provider for a JSON object body.
    pub json_response: bool,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub model: String,
    /// `WIDTHxHEIGHT`, e.g. `1024x1024`.
    pub size: String,
    pub quality: String,
    pub timeout: Duration,
}

/// Provider-wide defaults from which per-call parameters are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub text_model: String,
    pub image_model: String,
    pub image_size: String,
    pub timeout: Duration,
}

impl ModelSettings {
    #[must_use]
    pub fn from_config(config: &genome_core::AppConfig) -> Self {
        Self {
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
            timeout: Duration::from_secs(config.provider_timeout_secs),
        }
    }

    #[must_use]
    pub fn text(&self, temperature: f32, max_tokens: u32, json_response: bool) -> TextParams {
        TextParams {
            model: self.text_model.clone(),
            temperature,
            max_tokens,
            json_response,
            timeout: self.timeout,
        }
    }

    #[must_use]
    pub fn image(&self) -> ImageParams {
        ImageParams {
            model: self.image_model.clone(),
            size: self.image_size.clone(),
            quality: "standard".to_string(),
            timeout: self.timeout,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            text_model: "gpt-4-turbo-preview".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}
