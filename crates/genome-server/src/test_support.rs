use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use genome_analysis::{AnalysisPipeline, BrandResolver, GenomeAnalyzer, PipelineSettings, ReportCache};
use genome_chat::{ChatManager, ChatSettings};
use genome_core::ImageRef;
use genome_dispatch::{ReportDispatcher, ReportMailer};
use genome_llm::{CompletionProvider, ImageParams, Prompt, ProviderError, TextParams};

use crate::api::AppState;
use crate::jobs::{JobRunner, JobStore};

pub(crate) struct StubProvider {
    unauthorized: bool,
    // Text prompts whose system prompt contains this never answer.
    stall_on: Option<&'static str>,
}

impl StubProvider {
    pub(crate) fn ok() -> Arc<Self> {
        Arc::new(Self {
            unauthorized: false,
            stall_on: None,
        })
    }

    pub(crate) fn unauthorized() -> Arc<Self> {
        Arc::new(Self {
            unauthorized: true,
            stall_on: None,
        })
    }

    pub(crate) fn stalling_on(system_marker: &'static str) -> Arc<Self> {
        Arc::new(Self {
            unauthorized: false,
            stall_on: Some(system_marker),
        })
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete_text(
        &self,
        prompt: &Prompt,
        _params: &TextParams,
    ) -> Result<String, ProviderError> {
        if self.unauthorized {
            return Err(ProviderError::Auth("invalid api key".to_string()));
        }
        let system = prompt.system.as_deref().unwrap_or_default();
        if self.stall_on.is_some_and(|marker| system.contains(marker)) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        Ok(r#"{"summary": "stub analysis"}"#.to_string())
    }

    async fn complete_image(
        &self,
        _prompt: &str,
        _params: &ImageParams,
    ) -> Result<ImageRef, ProviderError> {
        if self.unauthorized {
            return Err(ProviderError::Auth("invalid api key".to_string()));
        }
        Ok(ImageRef {
            url: "https://img.example/stub.png".to_string(),
            revised_prompt: None,
        })
    }
}

pub(crate) fn runner_with(
    provider: Arc<StubProvider>,
    mailer: Arc<dyn ReportMailer>,
) -> JobRunner {
    let provider: Arc<dyn CompletionProvider> = provider;
    let cache = Arc::new(ReportCache::new());
    let pipeline = AnalysisPipeline::new(Arc::clone(&provider), PipelineSettings::default());
    let analyzer = GenomeAnalyzer::new(BrandResolver::offline(), pipeline, Arc::clone(&cache));
    let chat = ChatManager::new(provider, cache, ChatSettings::default());
    JobRunner {
        jobs: Arc::new(JobStore::new()),
        analyzer: Arc::new(analyzer),
        chat: Arc::new(chat),
        dispatcher: ReportDispatcher::new(mailer),
    }
}

pub(crate) fn state_with(provider: Arc<StubProvider>) -> AppState {
    AppState::new(runner_with(provider, Arc::new(genome_dispatch::LogMailer)))
}
