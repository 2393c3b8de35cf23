//! HTTP implementation of [`ChatBackend`]
//!
//! Talks JSON to the OdiaLingua REST backend with `reqwest`. Speech
//! synthesis is streamed so a cancelled playback request stops downloading
//! right away.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioBlob;
use crate::backend::types::{
    ChatReply, ChatRequest, CreateSessionReply, ErrorBody, HealthStatus, RenameRequest,
    SessionAction, StreamChatRequest, Transcription, TtsRequest,
};
use crate::backend::ChatBackend;
use crate::config::BackendConfig;
use crate::error::{OdiaLinguaError, Result};
use crate::session::Session;

/// Mime type assumed for synthesized speech when the backend sends none
const DEFAULT_TTS_MIME: &str = "audio/wav";

/// REST client for the OdiaLingua backend
///
/// # Examples
///
/// ```
/// use odialingua::backend::HttpBackend;
/// use odialingua::config::BackendConfig;
///
/// let backend = HttpBackend::new(&BackendConfig::default()).unwrap();
/// assert_eq!(backend.base_url(), "http://localhost:5000");
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new backend client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("odialingua/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OdiaLinguaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        tracing::info!("Initialized backend client: url={}", base_url);

        Ok(Self { client, base_url })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turns non-success statuses into [`OdiaLinguaError::Backend`]
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .map(ErrorBody::into_message);
        tracing::warn!(status = status.as_u16(), body = %body, "Backend request failed");
        Err(OdiaLinguaError::backend(status.as_u16(), detail).into())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        tracing::debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_ack<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: serde::Serialize + Sync,
    {
        tracing::debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let path = format!("chats/{}", user_id);
        tracing::debug!(path = %path, "GET");
        let response = self.client.get(self.url(&path)).send().await?;
        let response = Self::check(response).await?;
        let sessions: Vec<Session> = response.json().await?;
        tracing::info!(count = sessions.len(), "Fetched sessions");
        Ok(sessions)
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.post_json("chat", request).await
    }

    async fn stream_chat(&self, request: &StreamChatRequest) -> Result<ChatReply> {
        self.post_json("stream-chat", request).await
    }

    async fn create_session(&self) -> Result<String> {
        tracing::debug!("POST create-session");
        let response = self.client.post(self.url("create-session")).send().await?;
        let response = Self::check(response).await?;
        let reply: CreateSessionReply = response.json().await?;
        Ok(reply.session_id)
    }

    async fn clear_history(&self, session_id: &str) -> Result<()> {
        let body = SessionAction {
            session_id: session_id.to_string(),
        };
        self.post_ack("clear-history", &body).await
    }

    async fn delete_chat(&self, session_id: &str) -> Result<()> {
        let body = SessionAction {
            session_id: session_id.to_string(),
        };
        self.post_ack("delete-chat", &body).await
    }

    async fn rename_chat(&self, session_id: &str, name: &str) -> Result<()> {
        let body = RenameRequest {
            session_id: session_id.to_string(),
            name: name.to_string(),
        };
        self.post_ack("rename-chat", &body).await
    }

    async fn text_to_speech(&self, text: &str, cancel: &CancellationToken) -> Result<AudioBlob> {
        let body = TtsRequest {
            text: text.to_string(),
        };
        let request = self.client.post(self.url("text-to-speech")).json(&body).send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(OdiaLinguaError::Cancelled.into()),
            response = request => response?,
        };
        let response = Self::check(response).await?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_TTS_MIME)
            .to_string();

        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(OdiaLinguaError::Cancelled.into()),
                chunk = stream.next() => match chunk {
                    Some(chunk) => data.extend_from_slice(&chunk?),
                    None => break,
                },
            }
        }

        if data.is_empty() {
            return Err(OdiaLinguaError::Tts("Backend returned no audio".to_string()).into());
        }
        tracing::debug!(bytes = data.len(), mime = %mime_type, "Received synthesized audio");
        Ok(AudioBlob::new(data, mime_type))
    }

    async fn speech_to_text(&self, audio: &AudioBlob) -> Result<Transcription> {
        let part = multipart::Part::bytes(audio.data.to_vec())
            .file_name(audio.file_name())
            .mime_str(&audio.mime_type)?;
        let form = multipart::Form::new().part("audio", part);

        tracing::debug!(bytes = audio.len(), "POST speech-to-text");
        let response = self
            .client
            .post(self.url("speech-to-text"))
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let transcription: Transcription = response.json().await?;

        if !transcription.success {
            let message = transcription
                .message
                .unwrap_or_else(|| "Transcription failed".to_string());
            return Err(OdiaLinguaError::Audio(message).into());
        }
        Ok(transcription)
    }

    async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("")).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = BackendConfig {
            url: "http://localhost:5000/".to_string(),
            ..Default::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.url("/chat"), "http://localhost:5000/chat");
        assert_eq!(backend.url("chats/u1"), "http://localhost:5000/chats/u1");
    }

    #[test]
    fn test_health_url_is_root() {
        let backend = HttpBackend::new(&BackendConfig::default()).unwrap();
        assert_eq!(backend.url(""), "http://localhost:5000/");
    }
}
