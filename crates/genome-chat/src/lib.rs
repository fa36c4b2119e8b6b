//! Conversation session manager: per-brand chat sessions, intent routing
//! and typed turn results.

pub mod error;
pub mod intent;
pub mod manager;
pub mod result;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use intent::{
    match_keywords, wants_report, Classification, ClassifiedBy, CompletionMode, Intent,
    IntentClassifier,
};
pub use manager::{ChatManager, ChatSettings, CONTEXT_WINDOW_MESSAGES};
pub use result::{parse_competitors, parse_posts, CompetitorEntry, IntentResult, PostDraft};
pub use session::{ConversationExport, ConversationSession, SessionStart, SessionSummary};
pub use store::{SessionHandle, SessionStore};
