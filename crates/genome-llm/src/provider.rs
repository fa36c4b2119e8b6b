use async_trait::async_trait;
use genome_core::ImageRef;

use crate::error::ProviderError;
use crate::types::{ImageParams, Prompt, TextParams};

/// An external text/image generation service.
///
/// One call is one network request. Implementations do not retry; see
/// [`crate::retry::with_retry`] for the caller-side policy.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on empty prompts, provider rejections,
    /// timeouts and malformed responses.
    async fn complete_text(
        &self,
        prompt: &Prompt,
        params: &TextParams,
    ) -> Result<String, ProviderError>;

    /// Generate one image for `prompt`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`CompletionProvider::complete_text`].
    async fn complete_image(
        &self,
        prompt: &str,
        params: &ImageParams,
    ) -> Result<ImageRef, ProviderError>;
}
