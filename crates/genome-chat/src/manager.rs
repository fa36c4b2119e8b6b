//! Conversation session manager: owns the session store and runs turns.

use std::sync::Arc;
use std::time::Duration;

use genome_analysis::ReportCache;
use genome_core::{validate_message_text, AppConfig, BrandContext, IntentStrategy, Message};
use genome_llm::{with_deadline, with_retry, CompletionProvider, ModelSettings, RetryPolicy};
use genome_prompts::{fields, format_history, render, ContextFields, TemplateId};
use tokio::sync::MutexGuard;
use uuid::Uuid;

use crate::error::SessionError;
use crate::intent::{Classification, CompletionMode, IntentClassifier};
use crate::result::IntentResult;
use crate::session::{ConversationExport, ConversationSession, SessionStart, SessionSummary};
use crate::store::{SessionHandle, SessionStore};

/// Messages of history rendered into each prompt. Older messages stay in
/// the session but are not sent to the provider.
pub const CONTEXT_WINDOW_MESSAGES: usize = 12;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub models: ModelSettings,
    pub retry: RetryPolicy,
    pub strategy: IntentStrategy,
    pub context_window: usize,
    pub idle_timeout: Duration,
}

impl ChatSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            models: ModelSettings::from_config(config),
            retry: RetryPolicy::from_config(config),
            strategy: config.intent_strategy,
            context_window: CONTEXT_WINDOW_MESSAGES,
            idle_timeout: Duration::from_secs(config.session_idle_timeout_secs),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            models: ModelSettings::default(),
            retry: RetryPolicy::default(),
            strategy: IntentStrategy::KeywordsThenModel,
            context_window: CONTEXT_WINDOW_MESSAGES,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

pub struct ChatManager {
    provider: Arc<dyn CompletionProvider>,
    classifier: IntentClassifier,
    store: SessionStore,
    reports: Arc<ReportCache>,
    settings: ChatSettings,
}

impl ChatManager {
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        reports: Arc<ReportCache>,
        settings: ChatSettings,
    ) -> Self {
        let classifier_params = TemplateId::IntentClassifier
            .defaults()
            .map_or_else(
                || settings.models.text(0.0, 10, false),
                |d| settings.models.text(d.temperature, d.max_tokens, d.json_response),
            );
        Self {
            classifier: IntentClassifier::new(
                Arc::clone(&provider),
                settings.strategy,
                classifier_params,
            ),
            store: SessionStore::new(settings.idle_timeout),
            provider,
            reports,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Open a session for `brand`. A cached report for the brand, if any,
    /// is folded into the session's brand context.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Validation`] for a rejected brand identifier.
    pub async fn create_session(&self, brand: &str) -> Result<SessionStart, SessionError> {
        let mut session = ConversationSession::new(BrandContext::new(brand)?);
        if let Some(report) = self.reports.get(&session.brand.identifier).await {
            session.absorb_report(&report);
        }

        let start = SessionStart {
            summary: session.summary(),
            welcome_message: session.welcome_message(),
        };
        self.store.insert(session).await;

        tracing::info!(
            session_id = %start.summary.session_id,
            brand = %start.summary.brand_identifier,
            has_context = start.summary.has_context,
            "chat session started"
        );
        Ok(start)
    }

    /// Run one chat turn.
    ///
    /// The session is locked for the whole turn, so turns on one session
    /// run one at a time in arrival order. History grows by the user message
    /// and the reply only when the turn succeeds; a failed or cancelled turn
    /// leaves it untouched.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] for blank text (no provider call is made)
    /// - [`SessionError::UnknownSession`] / [`SessionError::Expired`]
    /// - [`SessionError::Provider`] when the completion call fails after retries
    pub async fn handle_message(
        &self,
        session_id: Uuid,
        text: &str,
    ) -> Result<IntentResult, SessionError> {
        let text = validate_message_text(text)?;
        let handle = self.handle(session_id).await?;
        let mut session = self.lock_live(session_id, &handle).await?;

        let classification = self.classifier.classify(text).await?;
        let intent = classification.intent;
        tracing::debug!(
            session_id = %session_id,
            intent = %intent,
            by = ?classification.by,
            "chat intent classified"
        );

        let result = self
            .respond(&session, text, classification)
            .await
            .inspect_err(|e| {
                tracing::warn!(session_id = %session_id, intent = %intent, error = %e, "chat turn failed");
            })?;

        session.push_turn(Message::user(text), result.assistant_message());
        self.store.record(session.summary()).await;
        tracing::info!(
            session_id = %session_id,
            intent = %intent,
            messages = session.messages().len(),
            "chat turn completed"
        );
        Ok(result)
    }

    async fn respond(
        &self,
        session: &ConversationSession,
        text: &str,
        classification: Classification,
    ) -> Result<IntentResult, SessionError> {
        let intent = classification.intent;
        let (template, mode) = intent.route();

        let mut context = ContextFields::for_brand(&session.brand).with(fields::REQUEST, text);
        let window = session.recent(self.settings.context_window);
        if !window.is_empty() {
            context.insert(fields::HISTORY, format_history(window));
        }
        let prompt = render(template, &context)?;
        let provider = &self.provider;

        match mode {
            CompletionMode::Image => {
                let params = self.settings.models.image();
                let deadline = params.timeout;
                let (enhanced, params_ref) = (prompt.user.as_str(), &params);
                let image = with_retry(self.settings.retry, intent.label(), move || {
                    with_deadline(deadline, provider.complete_image(enhanced, params_ref))
                })
                .await?;
                Ok(IntentResult::ImageAsset {
                    image,
                    prompt: text.to_string(),
                    enhanced_prompt: prompt.user.clone(),
                })
            }
            CompletionMode::Text => {
                let params = template.defaults().map_or_else(
                    || self.settings.models.text(0.7, 1500, false),
                    |d| {
                        self.settings
                            .models
                            .text(d.temperature, d.max_tokens, d.json_response)
                    },
                );
                let deadline = params.timeout;
                let (prompt_ref, params_ref) = (&prompt, &params);
                let reply = with_retry(self.settings.retry, intent.label(), move || {
                    with_deadline(deadline, provider.complete_text(prompt_ref, params_ref))
                })
                .await?;
                Ok(IntentResult::from_text(intent, reply))
            }
        }
    }

    /// Full message history of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] or [`SessionError::Expired`].
    pub async fn history(&self, session_id: Uuid) -> Result<Vec<Message>, SessionError> {
        let handle = self.handle(session_id).await?;
        let session = self.lock_live(session_id, &handle).await?;
        Ok(session.messages().to_vec())
    }

    /// Serializable transcript of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] or [`SessionError::Expired`].
    pub async fn export(&self, session_id: Uuid) -> Result<ConversationExport, SessionError> {
        let handle = self.handle(session_id).await?;
        let session = self.lock_live(session_id, &handle).await?;
        Ok(session.export())
    }

    /// Clear a session's history, keeping its brand context.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] or [`SessionError::Expired`].
    pub async fn reset(&self, session_id: Uuid) -> Result<SessionSummary, SessionError> {
        let handle = self.handle(session_id).await?;
        let mut session = self.lock_live(session_id, &handle).await?;
        session.reset();
        let summary = session.summary();
        self.store.record(summary.clone()).await;
        tracing::info!(session_id = %session_id, "chat session reset");
        Ok(summary)
    }

    /// Remove a session and hand back its transcript.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] if no such session exists.
    pub async fn end_session(&self, session_id: Uuid) -> Result<ConversationExport, SessionError> {
        let handle = self
            .store
            .remove(session_id)
            .await
            .ok_or(SessionError::UnknownSession(session_id))?;
        let export = handle.lock().await.export();
        tracing::info!(
            session_id = %session_id,
            messages = export.conversation.len(),
            "chat session ended"
        );
        Ok(export)
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store.summaries().await
    }

    pub async fn purge_expired(&self) -> usize {
        self.store.purge_expired().await
    }

    /// Brand context of a live session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSession`] or [`SessionError::Expired`].
    pub async fn brand_of(&self, session_id: Uuid) -> Result<BrandContext, SessionError> {
        let handle = self.handle(session_id).await?;
        let session = self.lock_live(session_id, &handle).await?;
        Ok(session.brand.clone())
    }

    async fn handle(&self, session_id: Uuid) -> Result<SessionHandle, SessionError> {
        self.store
            .get(session_id)
            .await
            .ok_or(SessionError::UnknownSession(session_id))
    }

    /// Lock a session, evicting it instead if it has been idle too long.
    /// A report cached since the session last saw one is folded in.
    async fn lock_live<'a>(
        &self,
        session_id: Uuid,
        handle: &'a SessionHandle,
    ) -> Result<MutexGuard<'a, ConversationSession>, SessionError> {
        let mut session = handle.lock().await;
        if session.is_expired(self.store.idle_timeout()) {
            drop(session);
            self.store.remove(session_id).await;
            tracing::info!(session_id = %session_id, "chat session expired");
            return Err(SessionError::Expired(session_id));
        }
        if let Some(report) = self.reports.get(&session.brand.identifier).await {
            if session.absorb_report(&report) {
                self.store.record(session.summary()).await;
            }
        }
        Ok(session)
    }
}
