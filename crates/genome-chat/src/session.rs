use std::time::Duration;

use chrono::{DateTime, Utc};
use genome_core::{BrandContext, Message, Report};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Conversation state for one brand and one user stream.
///
/// History is append-only except for an explicit [`reset`](Self::reset).
#[derive(Debug)]
pub struct ConversationSession {
    pub id: Uuid,
    pub brand: BrandContext,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    // Monotonic twin of `last_activity`, used for expiry.
    last_touched: Instant,
    absorbed_report: Option<Uuid>,
}

impl ConversationSession {
    #[must_use]
    pub fn new(brand: BrandContext) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            brand,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
            last_touched: Instant::now(),
            absorbed_report: None,
        }
    }

    /// Fold `report` into the brand context unless it was already folded in.
    /// Returns whether anything changed.
    pub fn absorb_report(&mut self, report: &Report) -> bool {
        if self.absorbed_report == Some(report.id) {
            return false;
        }
        self.brand.absorb_report(report);
        self.absorbed_report = Some(report.id);
        true
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The trailing `n` messages, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Record a completed turn: the user message, then the reply.
    pub fn push_turn(&mut self, user: Message, assistant: Message) {
        self.messages.push(user);
        self.messages.push(assistant);
        self.touch();
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
        self.last_touched = Instant::now();
    }

    #[must_use]
    pub fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.last_touched.elapsed() >= idle_timeout
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            brand: self.brand.display_name.clone(),
            brand_identifier: self.brand.identifier.clone(),
            has_context: self.brand.has_prior_analysis(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }

    #[must_use]
    pub fn export(&self) -> ConversationExport {
        ConversationExport {
            session_id: self.id,
            brand_context: self.brand.clone(),
            conversation: self.messages.clone(),
            exported_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn welcome_message(&self) -> String {
        format!(
            "Hi! I'm your personal AI strategist for **{}**.

I can help you with:
- Content creation (Instagram posts, captions, campaigns)
- Audience insights and personas
- Competitor analysis
- Growth strategies
- Engagement predictions
- Weekly content planning

What would you like to work on today?",
            self.brand.display_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub brand: String,
    pub brand_identifier: String,
    /// Whether an earlier report was folded into the brand context.
    pub has_context: bool,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Returned when a session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub welcome_message: String,
}

/// Serializable transcript of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationExport {
    pub session_id: Uuid,
    pub brand_context: BrandContext,
    pub conversation: Vec<Message>,
    pub exported_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ConversationSession {
        ConversationSession::new(BrandContext::new("acme").unwrap())
    }

    #[test]
    fn recent_returns_the_trailing_window() {
        let mut s = session();
        for i in 0..5 {
            s.push_turn(
                Message::user(format!("q{i}")),
                Message::assistant(format!("a{i}")),
            );
        }
        let window = s.recent(3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "a3");
        assert_eq!(window[2].content, "a4");
        assert_eq!(s.recent(100).len(), 10);
        assert_eq!(s.messages().len(), 10);
    }

    #[test]
    fn reset_keeps_brand() {
        let mut s = session();
        s.push_turn(Message::user("hi"), Message::assistant("hello"));
        s.reset();
        assert!(s.messages().is_empty());
        assert_eq!(s.brand.identifier, "acme");
    }

    #[test]
    fn welcome_names_the_brand() {
        assert!(session().welcome_message().contains("**acme**"));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_follows_idle_time() {
        let mut s = session();
        let idle = Duration::from_secs(60);
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!s.is_expired(idle));
        s.touch();
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!s.is_expired(idle));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(s.is_expired(idle));
    }
}
