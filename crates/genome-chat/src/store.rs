use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use genome_core::Report;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::session::{ConversationSession, SessionSummary};

/// Shared handle to one session. Holding the lock serializes turns.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

struct Entry {
    handle: SessionHandle,
    // Last summary recorded outside a turn; served while the session is locked.
    summary: SessionSummary,
}

/// Live sessions keyed by id, with an idle-expiry policy.
///
/// The map lock is only held to look up, insert or remove handles; work on
/// a session happens under that session's own mutex, so sessions never
/// block each other. Read-only sweeps never wait on a session mutex.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub async fn insert(&self, session: ConversationSession) -> SessionHandle {
        let id = session.id;
        let summary = session.summary();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            Entry {
                handle: Arc::clone(&handle),
                summary,
            },
        );
        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|entry| Arc::clone(&entry.handle))
    }

    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id).map(|entry| entry.handle)
    }

    /// Replace the listed summary of a session after it changed.
    pub async fn record(&self, summary: SessionSummary) {
        if let Some(entry) = self.sessions.write().await.get_mut(&summary.session_id) {
            entry.summary = summary;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Summaries of every live session, oldest first. A session with a turn
    /// in flight is listed from its last recorded summary.
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let idle = self.idle_timeout;
        let sessions = self.sessions.read().await;
        let mut out: Vec<SessionSummary> = sessions
            .values()
            .filter_map(|entry| match entry.handle.try_lock() {
                Ok(session) => (!session.is_expired(idle)).then(|| session.summary()),
                Err(_) => Some(entry.summary.clone()),
            })
            .collect();
        drop(sessions);
        out.sort_by_key(|s| s.created_at);
        out
    }

    /// Drop sessions idle for longer than the timeout. Sessions with a turn
    /// in flight are skipped. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let idle = self.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| match entry.handle.try_lock() {
            Ok(session) => !session.is_expired(idle),
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "expired chat sessions purged");
        }
        removed
    }

    /// Fold a freshly produced report into every idle session for the same
    /// brand. Sessions busy with a turn pick the report up from the cache
    /// the next time they are locked. Returns how many were updated now.
    pub async fn absorb_report(&self, report: &Report) -> usize {
        let key = report.brand.key();
        let mut sessions = self.sessions.write().await;
        let mut updated = 0;
        for entry in sessions.values_mut() {
            let Ok(mut session) = entry.handle.try_lock() else {
                continue;
            };
            if session.brand.key() == key && session.absorb_report(report) {
                entry.summary = session.summary();
                updated += 1;
            }
        }
        updated
    }
}
