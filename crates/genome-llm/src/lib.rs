//! Completion client for the external generative-AI provider.

pub mod error;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod types;

pub use error::ProviderError;
pub use openai::OpenAiClient;
pub use provider::CompletionProvider;
pub use retry::{with_deadline, with_retry, RetryPolicy};
pub use types::{ImageParams, ModelSettings, Prompt, TextParams};
