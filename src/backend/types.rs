//! Wire types for the OdiaLingua backend HTTP contract

use serde::{Deserialize, Serialize};

use crate::session::{Message, Role};

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Session the message belongs to (client-generated for new chats)
    pub session_id: String,
    /// The user's message text
    pub message: String,
    /// Authenticated user id
    pub user_id: String,
    /// Whether the backend must create the session document first
    pub is_new_chat: bool,
}

/// One history entry in a `POST /stream-chat` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message author
    pub role: Role,
    /// Message text
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of `POST /stream-chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChatRequest {
    /// Session the history belongs to
    pub session_id: String,
    /// Whole transcript including the new user message
    pub messages: Vec<WireMessage>,
}

/// Reply to `POST /chat` and `POST /stream-chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// `"success"` on the happy path
    #[serde(default)]
    pub status: Option<String>,
    /// Assistant reply text
    pub response: String,
    /// Title suggested for a brand-new session
    #[serde(default, rename = "newName", skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
}

/// Reply to `POST /create-session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionReply {
    /// `"success"` on the happy path
    #[serde(default)]
    pub status: Option<String>,
    /// Server-issued session id
    pub session_id: String,
}

/// Body of `POST /clear-history` and `POST /delete-chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAction {
    /// Target session
    pub session_id: String,
}

/// Body of `POST /rename-chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRequest {
    /// Target session
    pub session_id: String,
    /// New display name
    pub name: String,
}

/// Body of `POST /text-to-speech`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsRequest {
    /// Text to synthesize
    pub text: String,
}

/// Reply to `POST /speech-to-text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    /// Whether transcription succeeded
    #[serde(default)]
    pub success: bool,
    /// Recognized text
    #[serde(default)]
    pub transcript: String,
    /// Language code detected by the recognizer, e.g. `od-IN`
    #[serde(default)]
    pub detected_language: Option<String>,
    /// Human readable status
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply to `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"ok"` when the backend is up
    pub status: String,
    /// Free-form description
    #[serde(default)]
    pub message: Option<String>,
}

/// FastAPI error body
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Flattens `detail` to text; validation errors arrive as arrays
    pub(crate) fn into_message(self) -> String {
        match self.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}
