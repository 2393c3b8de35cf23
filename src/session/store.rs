//! In-memory session collection and current-session pointer
//!
//! `SessionStore` is pure bookkeeping: it performs no I/O and never fails on
//! network grounds. The controller layers the backend calls on top of it.
//!
//! Two invariants hold after every public method returns:
//! - the current session id is `None` or names exactly one stored session
//! - session ids are unique

use crate::session::types::{Message, MessageStatus, Session};

/// What the chat pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// No session selected; suggestions are shown
    Welcome,
    /// A session is selected and its transcript is shown
    Chat,
}

/// Ordered collection of sessions plus the current selection
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    current: Option<String>,
}

impl SessionStore {
    /// Creates an empty store in the welcome state
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `sessions`, in the welcome state
    ///
    /// Later duplicates of an id are dropped.
    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        let mut store = Self::new();
        store.replace_all(sessions);
        store
    }

    /// Replaces the whole collection and returns to the welcome state
    pub fn replace_all(&mut self, sessions: Vec<Session>) {
        let mut unique: Vec<Session> = Vec::with_capacity(sessions.len());
        for session in sessions {
            if unique.iter().any(|s| s.id == session.id) {
                tracing::warn!(session_id = %session.id, "Dropping duplicate session");
                continue;
            }
            unique.push(session);
        }
        self.sessions = unique;
        self.current = None;
    }

    /// Sessions in collection order
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Sessions ordered most-recently-updated first, for display
    pub fn ordered_by_recency(&self) -> Vec<&Session> {
        let mut ordered: Vec<&Session> = self.sessions.iter().collect();
        ordered.sort_by(|a, b| b.recency().cmp(&a.recency()));
        ordered
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Id of the current session, if any
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The current session, if any
    pub fn current(&self) -> Option<&Session> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    /// Name shown in the header: the current session's name or the default
    pub fn current_name(&self) -> &str {
        self.current()
            .map(|s| s.name.as_str())
            .unwrap_or(crate::session::DEFAULT_SESSION_NAME)
    }

    /// What the chat pane shows
    pub fn view(&self) -> View {
        if self.current.is_some() {
            View::Chat
        } else {
            View::Welcome
        }
    }

    /// Looks up a session by id
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Selects an existing session; returns `false` for unknown ids
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.current = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Returns to the welcome state
    pub fn deselect(&mut self) {
        self.current = None;
    }

    /// Inserts a session at the front and selects it
    ///
    /// Returns `false` (and changes nothing) if the id is already taken.
    pub fn insert_front(&mut self, session: Session) -> bool {
        if self.get(&session.id).is_some() {
            return false;
        }
        self.current = Some(session.id.clone());
        self.sessions.insert(0, session);
        true
    }

    /// Appends a message; returns its index, or `None` for unknown ids
    pub fn append(&mut self, id: &str, message: Message) -> Option<usize> {
        let session = self.get_mut(id)?;
        session.push(message);
        Some(session.messages.len() - 1)
    }

    /// Updates the delivery state of one message
    pub fn set_message_status(&mut self, id: &str, index: usize, status: MessageStatus) -> bool {
        match self.get_mut(id).and_then(|s| s.messages.get_mut(index)) {
            Some(message) => {
                message.status = status;
                true
            }
            None => false,
        }
    }

    /// Renames a session
    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(session) => {
                session.name = name.into();
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Empties a session's transcript
    pub fn clear(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(session) => {
                session.messages.clear();
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Marks a client-created session as known to the backend
    pub fn mark_synced(&mut self, id: &str) {
        if let Some(session) = self.get_mut(id) {
            session.synced = true;
        }
    }

    /// Removes a session
    ///
    /// When the removed session was current, the first remaining session
    /// becomes current, or the store returns to the welcome state.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let pos = self.sessions.iter().position(|s| s.id == id)?;
        let removed = self.sessions.remove(pos);
        if self.current.as_deref() == Some(id) {
            self.current = self.sessions.first().map(|s| s.id.clone());
        }
        Some(removed)
    }
}
