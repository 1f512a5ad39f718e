use crate::Turn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

pub type SessionTurns = Arc<Mutex<Vec<Turn>>>;

/// Per-session, append-only chat history.
pub trait ConversationStore: Send + Sync {
    /// The session's turn list, created empty on first access.
    fn session(&self, session_id: &str) -> SessionTurns;

    fn append(&self, session_id: &str, turn: Turn) {
        let session = self.session(session_id);
        let mut turns = session.lock().unwrap_or_else(PoisonError::into_inner);
        turns.push(turn);
    }

    fn get(&self, session_id: &str) -> Vec<Turn> {
        let session = self.session(session_id);
        let turns = session.lock().unwrap_or_else(PoisonError::into_inner);
        turns.clone()
    }

    fn clear(&self, session_id: &str) {
        let session = self.session(session_id);
        let mut turns = session.lock().unwrap_or_else(PoisonError::into_inner);
        turns.clear();
    }
}

/// Process-lifetime store. The map lock is held only to find or insert a
/// session; each session's turns sit behind their own mutex.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, SessionTurns>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn session(&self, session_id: &str) -> SessionTurns {
        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = sessions.get(session_id) {
                return Arc::clone(existing);
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(session_id.to_string()).or_default())
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
