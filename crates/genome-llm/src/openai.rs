//! HTTP client for OpenAI-compatible chat and image endpoints.
//!
//! Maps provider statuses onto [`ProviderError`] so callers can tell auth,
//! rate-limit and transient failures apart. Every call is bounded by the
//! timeout carried in its parameters.

use std::time::Duration;

use async_trait::async_trait;
use genome_core::ImageRef;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::CompletionProvider;
use crate::retry::with_deadline;
use crate::types::{ImageParams, Prompt, TextParams};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_RETRY_AFTER_SECS: u64 = 20;
const ERROR_BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
}

/// Client for an OpenAI-compatible completion API.
///
/// Use [`OpenAiClient::new`] for production or [`OpenAiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    chat_url: Url,
    images_url: Url,
}

impl OpenAiClient {
    /// Creates a client pointed at the public OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client from application config.
    ///
    /// # Errors
    ///
    /// See [`OpenAiClient::with_base_url`].
    pub fn from_config(config: &genome_core::AppConfig) -> Result<Self, ProviderError> {
        Self::with_base_url(
            &config.openai_api_key,
            config.provider_timeout_secs,
            &config.provider_base_url,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the `reqwest::Client` cannot be
    /// constructed, or [`ProviderError::InvalidRequest`] if `base_url` is not
    /// a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("market-genome/0.1")
            .build()?;

        let base = base_url.trim_end_matches('/');
        let parse = |path: &str| {
            Url::parse(&format!("{base}/{path}")).map_err(|e| {
                ProviderError::InvalidRequest(format!("invalid base URL '{base_url}': {e}"))
            })
        };

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            chat_url: parse("chat/completions")?,
            images_url: parse("images/generations")?,
        })
    }

    /// POSTs `body` to `url` and returns the parsed JSON response.
    async fn post_json<B: Serialize + Sync>(
        &self,
        url: &Url,
        body: &B,
        context: &str,
    ) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, retry_after_secs, &body));
        }

        let text = response.text().await.map_err(map_transport)?;
        serde_json::from_str(&text).map_err(|e| ProviderError::MalformedResponse {
            context: context.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete_text(
        &self,
        prompt: &Prompt,
        params: &TextParams,
    ) -> Result<String, ProviderError> {
        if prompt.is_empty() {
            return Err(ProviderError::InvalidRequest("prompt is empty".to_string()));
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = prompt.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });

        let request = ChatRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: params.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let body = with_deadline(
            params.timeout,
            self.post_json(&self.chat_url, &request, "chat completion"),
        )
        .await?;

        let content = extract_chat_content(&body)?;
        tracing::debug!(
            model = %params.model,
            chars = content.len(),
            "text completion received"
        );
        Ok(content)
    }

    async fn complete_image(
        &self,
        prompt: &str,
        params: &ImageParams,
    ) -> Result<ImageRef, ProviderError> {
        if prompt.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "image prompt is empty".to_string(),
            ));
        }

        let request = ImageRequest {
            model: &params.model,
            prompt,
            size: &params.size,
            quality: &params.quality,
            n: 1,
        };

        let body = with_deadline(
            params.timeout,
            self.post_json(&self.images_url, &request, "image generation"),
        )
        .await?;

        let image = extract_image_ref(&body)?;
        tracing::debug!(model = %params.model, size = %params.size, "image generated");
        Ok(image)
    }
}

fn map_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout { after_ms: 0 }
    } else {
        ProviderError::Transport(err)
    }
}

fn map_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> ProviderError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::InvalidRequest(message)
        }
        other => ProviderError::Api {
            status: other.as_u16(),
            message,
        },
    }
}

/// Pulls `error.message` out of an error body, falling back to a preview of
/// the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect())
}

fn extract_chat_content(body: &Value) -> Result<String, ProviderError> {
    let content = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::MalformedResponse {
            context: "chat completion".to_string(),
            reason: "missing choices[0].message.content".to_string(),
        })?;

    if content.trim().is_empty() {
        return Err(ProviderError::MalformedResponse {
            context: "chat completion".to_string(),
            reason: "empty completion".to_string(),
        });
    }
    Ok(content.to_string())
}

fn extract_image_ref(body: &Value) -> Result<ImageRef, ProviderError> {
    let first = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first());
    let url = first
        .and_then(|d| d.get("url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse {
            context: "image generation".to_string(),
            reason: "missing data[0].url".to_string(),
        })?;
    let revised_prompt = first
        .and_then(|d| d.get("revised_prompt"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(ImageRef {
        url: url.to_string(),
        revised_prompt,
    })
}
