//! In-memory conversation sessions.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Who said something in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone)]
struct Turn {
    speaker: Speaker,
    content: String,
}

#[derive(Debug, Clone)]
struct Session {
    turns: Vec<Turn>,
    updated_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Keeps the last few exchanges of each conversation.
///
/// Sessions idle for longer than the idle timeout are dropped whenever a new
/// session is created.
pub struct SessionManager {
    max_history: usize,
    idle_timeout: Option<Duration>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(2)
    }
}

impl SessionManager {
    /// Create a manager keeping `max_history` exchanges per session.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            idle_timeout: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Expire sessions that have not changed for `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new, empty session and return its id.
    pub fn create_session(&self) -> String {
        if let Some(timeout) = self.idle_timeout {
            self.expire_idle_before(Utc::now() - timeout);
        }

        let id = Uuid::new_v4().to_string();
        self.sessions().insert(id.clone(), Session::new());
        debug!("Created session {}", id);
        id
    }

    /// Whether a session with this id exists.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions().contains_key(session_id)
    }

    /// Record one message, creating the session if needed.
    pub fn add_message(&self, session_id: &str, speaker: Speaker, content: &str) {
        let limit = self.max_history * 2;
        let mut sessions = self.sessions();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(Session::new);

        session.turns.push(Turn {
            speaker,
            content: content.to_string(),
        });
        if session.turns.len() > limit {
            let excess = session.turns.len() - limit;
            session.turns.drain(..excess);
        }
        session.updated_at = Utc::now();
    }

    /// Record a question and its answer.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        self.add_message(session_id, Speaker::User, user);
        self.add_message(session_id, Speaker::Assistant, assistant);
    }

    /// Recent history rendered as `User: ...` / `Assistant: ...` lines.
    ///
    /// Returns `None` for unknown or empty sessions.
    pub fn conversation_history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions();
        let session = sessions.get(session_id)?;
        if session.turns.is_empty() {
            return None;
        }

        Some(
            session
                .turns
                .iter()
                .map(|turn| format!("{}: {}", turn.speaker.label(), turn.content))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// When the session last changed.
    pub fn last_activity(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.sessions().get(session_id).map(|s| s.updated_at)
    }

    /// Drop a session's history. Returns whether it existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.sessions().remove(session_id).is_some()
    }

    /// Drop sessions last changed before `cutoff`. Returns how many went.
    pub fn expire_idle_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!("Expired {} idle sessions", expired);
        }
        expired
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
