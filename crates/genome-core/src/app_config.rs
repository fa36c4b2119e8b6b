use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How chat messages are mapped to an intent.
///
/// Whenever keywords take part they win over the model: a keyword hit never
/// reaches the classifier call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStrategy {
    /// Keyword rules only; anything unmatched is a freeform reply.
    Keywords,
    /// Always ask the provider to classify.
    Model,
    /// Keyword rules first, provider classification for the rest.
    KeywordsThenModel,
}

impl std::fmt::Display for IntentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentStrategy::Keywords => write!(f, "keywords"),
            IntentStrategy::Model => write!(f, "model"),
            IntentStrategy::KeywordsThenModel => write!(f, "keywords_then_model"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub provider_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub image_size: String,
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
    pub provider_retry_backoff_base_ms: u64,
    pub pipeline_max_concurrency: usize,
    pub session_idle_timeout_secs: u64,
    pub intent_strategy: IntentStrategy,
    pub resolve_websites: bool,
    pub mail_relay_url: Option<String>,
    pub mail_relay_token: Option<String>,
    pub sender_email: String,
    pub sender_name: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"[redacted]")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("provider_base_url", &self.provider_base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("image_size", &self.image_size)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("provider_max_retries", &self.provider_max_retries)
            .field(
                "provider_retry_backoff_base_ms",
                &self.provider_retry_backoff_base_ms,
            )
            .field("pipeline_max_concurrency", &self.pipeline_max_concurrency)
            .field("session_idle_timeout_secs", &self.session_idle_timeout_secs)
            .field("intent_strategy", &self.intent_strategy)
            .field("resolve_websites", &self.resolve_websites)
            .field("mail_relay_url", &self.mail_relay_url)
            .field(
                "mail_relay_token",
                &self.mail_relay_token.as_ref().map(|_| "[redacted]"),
            )
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .finish()
    }
}
