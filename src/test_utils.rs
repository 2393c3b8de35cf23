//! Test utilities for OdiaLingua
//!
//! In-memory stand-ins for the backend, the audio output and the microphone,
//! plus a few assertion helpers shared by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioBlob, AudioChunk, AudioSink, CaptureConstraints, CaptureDevice, CaptureStream};
use crate::backend::{ChatBackend, ChatReply, ChatRequest, HealthStatus, StreamChatRequest, Transcription};
use crate::config::Config;
use crate::error::{CaptureError, OdiaLinguaError, Result};
use crate::session::Session;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Path of a database file inside `dir`
pub fn temp_db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("local.db")
}

/// Assert that an error's display contains `expected`
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(v) => panic!("Expected error containing '{}' but got Ok({:?})", expected, v),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Configuration YAML exercising every section
pub fn test_config_yaml() -> String {
    r#"
backend:
  url: http://127.0.0.1:9000
  timeout_seconds: 5
  transport: stream_chat
appwrite:
  endpoint: https://appwrite.example.com/v1
  project_id: odialingua-test
audio:
  autoplay: true
  player_command: [mpv, --really-quiet]
  max_upload_bytes: 1024
"#
    .to_string()
}

/// Default configuration
pub fn test_config() -> Config {
    Config::default()
}

/// Scripted in-memory backend
///
/// Every call is recorded as `"endpoint:arg"`. Endpoints listed through
/// [`MockBackend::fail`] answer with a backend error of that status.
#[derive(Default)]
pub struct MockBackend {
    sessions: Mutex<Vec<Session>>,
    replies: Mutex<VecDeque<ChatReply>>,
    failures: Mutex<HashMap<String, u16>>,
    calls: Mutex<Vec<String>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    stream_requests: Mutex<Vec<StreamChatRequest>>,
    tts_gate: Mutex<Option<Arc<Notify>>>,
    tts_count: AtomicUsize,
    created: AtomicUsize,
}

impl MockBackend {
    /// Backend with no sessions that echoes every message
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose `GET /chats/{user}` returns `sessions`
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let backend = Self::default();
        *backend.sessions.lock().unwrap() = sessions;
        backend
    }

    /// Makes `endpoint` fail with `status`
    pub fn fail(&self, endpoint: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), status);
    }

    /// Lets `endpoint` succeed again
    pub fn heal(&self, endpoint: &str) {
        self.failures.lock().unwrap().remove(endpoint);
    }

    /// Queues the next chat reply
    pub fn reply(&self, response: &str, new_name: Option<&str>) {
        self.replies.lock().unwrap().push_back(ChatReply {
            status: Some("success".to_string()),
            response: response.to_string(),
            new_name: new_name.map(str::to_string),
        });
    }

    /// Holds text-to-speech requests until the returned handle is notified
    pub fn hold_tts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.tts_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Number of text-to-speech requests received
    pub fn tts_calls(&self) -> usize {
        self.tts_count.load(Ordering::SeqCst)
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Bodies of `POST /chat` requests
    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    /// Bodies of `POST /stream-chat` requests
    pub fn stream_requests(&self) -> Vec<StreamChatRequest> {
        self.stream_requests.lock().unwrap().clone()
    }

    fn record(&self, endpoint: &str, arg: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", endpoint, arg));
        match self.failures.lock().unwrap().get(endpoint) {
            Some(status) => Err(OdiaLinguaError::backend(*status, None).into()),
            None => Ok(()),
        }
    }

    fn next_reply(&self, message: &str) -> ChatReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatReply {
                status: Some("success".to_string()),
                response: format!("echo: {}", message),
                new_name: None,
            })
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        self.record("chats", user_id)?;
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat_requests.lock().unwrap().push(request.clone());
        self.record("chat", &request.session_id)?;
        Ok(self.next_reply(&request.message))
    }

    async fn stream_chat(&self, request: &StreamChatRequest) -> Result<ChatReply> {
        self.stream_requests.lock().unwrap().push(request.clone());
        self.record("stream-chat", &request.session_id)?;
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(self.next_reply(&last))
    }

    async fn create_session(&self) -> Result<String> {
        self.record("create-session", "")?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("server-{}", n))
    }

    async fn clear_history(&self, session_id: &str) -> Result<()> {
        self.record("clear-history", session_id)
    }

    async fn delete_chat(&self, session_id: &str) -> Result<()> {
        self.record("delete-chat", session_id)
    }

    async fn rename_chat(&self, session_id: &str, name: &str) -> Result<()> {
        self.record("rename-chat", &format!("{}={}", session_id, name))
    }

    async fn text_to_speech(&self, text: &str, cancel: &CancellationToken) -> Result<AudioBlob> {
        self.tts_count.fetch_add(1, Ordering::SeqCst);
        self.record("text-to-speech", text)?;
        let gate = self.tts_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => return Err(OdiaLinguaError::Cancelled.into()),
                _ = gate.notified() => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(OdiaLinguaError::Cancelled.into());
        }
        Ok(AudioBlob::new(text.as_bytes().to_vec(), "audio/wav"))
    }

    async fn speech_to_text(&self, audio: &AudioBlob) -> Result<Transcription> {
        self.record("speech-to-text", &audio.len().to_string())?;
        Ok(Transcription {
            success: true,
            transcript: "ନମସ୍କାର".to_string(),
            detected_language: Some("od-IN".to_string()),
            message: Some("Transcription successful".to_string()),
        })
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.record("health", "")?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            message: None,
        })
    }
}

/// Audio sink that counts plays instead of making sound
pub struct RecordingSink {
    hold: bool,
    plays: AtomicUsize,
    stopped: AtomicUsize,
}

impl RecordingSink {
    /// Clips "play" until stopped
    pub fn holding() -> Self {
        Self {
            hold: true,
            plays: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        }
    }

    /// Clips finish immediately
    pub fn instant() -> Self {
        Self {
            hold: false,
            ..Self::holding()
        }
    }

    /// Number of clips started
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    /// Number of clips ended by their stop token
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, _clip: AudioBlob, stop: CancellationToken) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.hold {
            stop.cancelled().await;
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Microphone that yields a fixed list of chunks, then stays open silently
pub struct FakeCaptureDevice {
    chunks: Mutex<Option<Vec<AudioChunk>>>,
    error: Option<CaptureError>,
    drained: Arc<Notify>,
    drained_flag: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl FakeCaptureDevice {
    /// Device whose single stream yields `chunks`
    pub fn with_chunks(chunks: Vec<AudioChunk>) -> Self {
        Self {
            chunks: Mutex::new(Some(chunks)),
            error: None,
            drained: Arc::new(Notify::new()),
            drained_flag: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Device that refuses to open
    pub fn failing(error: CaptureError) -> Self {
        Self {
            error: Some(error),
            ..Self::with_chunks(Vec::new())
        }
    }

    /// Waits until the stream has been asked for a chunk past the last one
    pub async fn wait_drained(&self) {
        while !self.drained_flag.load(Ordering::SeqCst) {
            tokio::select! {
                _ = self.drained.notified() => {}
                _ = tokio::time::sleep(std::time::Duration::from_millis(5)) => {}
            }
        }
    }

    /// Whether the stream was closed
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for FakeCaptureDevice {
    async fn open(
        &self,
        _constraints: &CaptureConstraints,
    ) -> std::result::Result<Box<dyn CaptureStream>, CaptureError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let chunks = self.chunks.lock().unwrap().take().unwrap_or_default();
        Ok(Box::new(FakeStream {
            chunks: chunks.into(),
            drained: Arc::clone(&self.drained),
            drained_flag: Arc::clone(&self.drained_flag),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct FakeStream {
    chunks: VecDeque<AudioChunk>,
    drained: Arc<Notify>,
    drained_flag: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl CaptureStream for FakeStream {
    async fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        self.drained_flag.store(true, Ordering::SeqCst);
        self.drained.notify_waiters();
        std::future::pending::<()>().await;
        Ok(None)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(OdiaLinguaError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<()> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    fn test_test_config_yaml_parses() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.audio.autoplay);
    }

    #[tokio::test]
    async fn test_mock_backend_failure() {
        let backend = MockBackend::new();
        backend.fail("chat", 500);
        let request = ChatRequest {
            session_id: "s1".into(),
            message: "hi".into(),
            user_id: "u1".into(),
            is_new_chat: false,
        };
        let err = backend.send_message(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Server error: 500");
        backend.heal("chat");
        assert!(backend.send_message(&request).await.is_ok());
        assert_eq!(backend.calls(), vec!["chat:s1", "chat:s1"]);
    }
}
