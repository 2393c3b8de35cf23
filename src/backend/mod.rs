//! Chat backend abstraction
//!
//! This module defines the [`ChatBackend`] trait the controller talks to,
//! along with the HTTP implementation and the wire types of the backend
//! contract.

pub mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::{
    ChatReply, ChatRequest, CreateSessionReply, HealthStatus, StreamChatRequest, Transcription,
    WireMessage,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioBlob;
use crate::error::Result;
use crate::session::Session;

/// Operations offered by the OdiaLingua backend
///
/// Implementations surface non-success statuses as
/// [`OdiaLinguaError::Backend`](crate::error::OdiaLinguaError::Backend).
///
/// # Examples
///
/// ```no_run
/// use odialingua::backend::{ChatBackend, ChatRequest, HttpBackend};
/// use odialingua::config::BackendConfig;
///
/// # async fn example() -> odialingua::error::Result<()> {
/// let backend = HttpBackend::new(&BackendConfig::default())?;
/// let reply = backend
///     .send_message(&ChatRequest {
///         session_id: "s1".into(),
///         message: "Hello".into(),
///         user_id: "u1".into(),
///         is_new_chat: true,
///     })
///     .await?;
/// println!("{}", reply.response);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /chats/{user_id}`
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>>;

    /// `POST /chat`
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /stream-chat`
    async fn stream_chat(&self, request: &StreamChatRequest) -> Result<ChatReply>;

    /// `POST /create-session`; returns the server-issued id
    async fn create_session(&self) -> Result<String>;

    /// `POST /clear-history`
    async fn clear_history(&self, session_id: &str) -> Result<()>;

    /// `POST /delete-chat`
    async fn delete_chat(&self, session_id: &str) -> Result<()>;

    /// `POST /rename-chat`
    async fn rename_chat(&self, session_id: &str, name: &str) -> Result<()>;

    /// `POST /text-to-speech`
    ///
    /// Stops downloading and returns
    /// [`OdiaLinguaError::Cancelled`](crate::error::OdiaLinguaError::Cancelled)
    /// once `cancel` fires.
    async fn text_to_speech(&self, text: &str, cancel: &CancellationToken) -> Result<AudioBlob>;

    /// `POST /speech-to-text`
    async fn speech_to_text(&self, audio: &AudioBlob) -> Result<Transcription>;

    /// `GET /`
    async fn health(&self) -> Result<HealthStatus>;
}
