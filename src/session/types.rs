//! Chat message and session types
//!
//! These are the JSON shapes exchanged with the backend and mirrored into
//! local storage. Client-only bookkeeping fields are omitted from the JSON
//! whenever they hold their settled value so the wire format stays the one
//! the backend expects.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to sessions before the backend suggests one
pub const DEFAULT_SESSION_NAME: &str = "New Chat";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed (or dictated) by the person using the client
    User,
    /// Produced by the backend, including synthetic error notes
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "You"),
            Self::Assistant => write!(f, "Assistant"),
        }
    }
}

/// Delivery state of a message written before the backend confirmed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Appended locally, request in flight
    Pending,
    /// Acknowledged by the backend (or loaded from it)
    #[default]
    Confirmed,
    /// The backend call failed; the message exists only locally
    Failed,
}

impl MessageStatus {
    fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// One entry in a conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message
    pub role: Role,
    /// Markdown text of the message
    pub content: String,
    /// Creation time in Unix epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Client-side delivery state
    #[serde(default, skip_serializing_if = "MessageStatus::is_confirmed")]
    pub status: MessageStatus,
}

impl Message {
    /// Creates a user message stamped with the current time
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::session::{Message, Role};
    ///
    /// let msg = Message::user("Hello");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.timestamp.is_some());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message stamped with the current time
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates the assistant message recorded in place of a failed reply
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::session::Message;
    ///
    /// let msg = Message::error("Server error: 500");
    /// assert_eq!(msg.content, "Error: Server error: 500");
    /// ```
    pub fn error(description: impl fmt::Display) -> Self {
        Self::assistant(format!("Error: {}", description))
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(now_millis()),
            status: MessageStatus::Confirmed,
        }
    }

    /// Marks the message as awaiting backend confirmation
    pub fn pending(mut self) -> Self {
        self.status = MessageStatus::Pending;
        self
    }
}

/// A named conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Server-issued or client-generated identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Transcript, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Last mutation time in Unix epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    /// Creation time in Unix epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// `false` while a client-created session is unknown to the backend
    #[serde(default = "default_synced", skip_serializing_if = "is_true")]
    pub synced: bool,
}

fn default_synced() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

impl Session {
    /// Creates an empty session known to the backend
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
            last_updated: Some(now),
            created_at: Some(now),
            synced: true,
        }
    }

    /// Creates a session with a fresh client-side id, not yet known to the backend
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::session::{Session, DEFAULT_SESSION_NAME};
    ///
    /// let session = Session::optimistic();
    /// assert_eq!(session.name, DEFAULT_SESSION_NAME);
    /// assert!(!session.synced);
    /// assert_eq!(session.id.len(), 36);
    /// ```
    pub fn optimistic() -> Self {
        let mut session = Self::new(uuid::Uuid::new_v4().to_string(), DEFAULT_SESSION_NAME);
        session.synced = false;
        session
    }

    /// Appends a message and bumps `last_updated`
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Bumps `last_updated` to now
    pub fn touch(&mut self) {
        self.last_updated = Some(now_millis());
    }

    /// Sort key for recency ordering; sessions without timestamps sort last
    pub fn recency(&self) -> i64 {
        self.last_updated.or(self.created_at).unwrap_or(i64::MIN)
    }
}

/// Current time in Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
