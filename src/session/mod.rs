//! In-memory conversations keyed by session id.
//!
//! Each session's [`Conversation`] sits behind its own async mutex.
//! Holding that lock for a whole turn makes a session single-flight
//! while different sessions run concurrently.
//!
//! The store is bounded: clearing a session removes it, and once
//! `max_sessions` are live, opening a new one evicts the least recently
//! used session that no turn is currently holding.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::conversation::{Conversation, DEFAULT_MAX_HISTORY};

/// Session used when a caller does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Live sessions kept before the least recently used one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1_000;

pub type SharedConversation = Arc<Mutex<Conversation>>;

struct Entry {
    conversation: SharedConversation,
    last_used: Instant,
}

pub struct SessionStore {
    system_prompt: String,
    max_sessions: usize,
    max_history: usize,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionStore {
    /// New sessions start with `system_prompt` as their instructions.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_history: DEFAULT_MAX_HISTORY,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the number of live sessions (at least one).
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// History cap given to every new conversation.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Map a caller-supplied id to the key actually used.
    pub fn session_key(id: Option<&str>) -> String {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => DEFAULT_SESSION.to_string(),
        }
    }

    pub async fn get_or_create(&self, id: &str) -> SharedConversation {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = now;
            return entry.conversation.clone();
        }

        if sessions.len() >= self.max_sessions {
            evict_idle(&mut sessions);
        }
        debug!(session = %id, "creating session");
        let conversation = Arc::new(Mutex::new(
            Conversation::new(self.system_prompt.clone()).with_max_history(self.max_history),
        ));
        sessions.insert(
            id.to_string(),
            Entry {
                conversation: conversation.clone(),
                last_used: now,
            },
        );
        conversation
    }

    /// Forget a session.  Returns `false` if it did not exist.
    ///
    /// A turn already running on the session finishes against the
    /// dropped conversation; the next message starts a fresh one.
    pub async fn clear(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id);
        match removed {
            Some(_) => {
                debug!(session = %id, "session cleared");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(crate::conversation::DEFAULT_SYSTEM_PROMPT)
    }
}

/// Drop the least recently used session nobody is holding.  Sessions
/// with a turn in flight are skipped; if all are busy the store grows
/// past its cap until one frees up.
fn evict_idle(sessions: &mut HashMap<String, Entry>) {
    let victim = sessions
        .iter()
        .filter(|(_, e)| Arc::strong_count(&e.conversation) == 1)
        .min_by_key(|(_, e)| e.last_used)
        .map(|(id, _)| id.clone());
    match victim {
        Some(id) => {
            sessions.remove(&id);
            debug!(session = %id, "evicted least recently used session");
        }
        None => warn!(
            sessions = sessions.len(),
            "session cap reached but every session is busy"
        ),
    }
}
