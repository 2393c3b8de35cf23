//! Chat controller
//!
//! [`ChatController`] owns everything one signed-in user's chat screen needs:
//! the session store, the backend client, the local-storage mirror, the
//! mutation log and the TTS player. Operations never return network errors;
//! each reports a small outcome and queues a [`Notification`] for the UI.
//!
//! Every backend call races the controller's lifecycle token, so nothing is
//! applied after [`ChatController::shutdown`] or drop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioBlob, AudioSink, PlaybackMode, TtsPlayer, TtsState, TtsTransition};
use crate::auth::User;
use crate::backend::{ChatBackend, ChatReply, ChatRequest, StreamChatRequest, WireMessage};
use crate::config::{ChatTransport, Config};
use crate::error::{OdiaLinguaError, Result};
use crate::session::log::{MutationKind, MutationLog};
use crate::session::store::{SessionStore, View};
use crate::session::types::{Message, MessageStatus, Session, DEFAULT_SESSION_NAME};
use crate::storage::SessionCache;

/// Starter prompts shown on the welcome screen
pub const WELCOME_SUGGESTIONS: &[&str] = &[
    "Teach me some basic greetings in Odia",
    "What is the significance of the Rath Yatra in Puri?",
    "Tell me about the history of the Konark Sun Temple",
    "Which dishes are part of the Mahaprasad at the Jagannath Temple?",
    "Explain the origins of Odissi dance",
    "How is the Odia script different from Bengali?",
];

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Neutral information
    Info,
    /// An action completed
    Success,
    /// An action failed
    Error,
}

/// Transient message for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Text to show
    pub message: String,
}

/// Result of [`ChatController::fetch_sessions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Sessions came from the backend
    Loaded(usize),
    /// The backend failed; sessions came from the local mirror
    Cached(usize),
    /// The backend failed and no mirror exists
    Failed,
}

/// Result of a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text or no signed-in user; nothing changed
    Rejected,
    /// The assistant replied
    Replied {
        /// Session the exchange belongs to
        session_id: String,
    },
    /// The backend call failed; an error message was added to the transcript
    Failed {
        /// Session the exchange belongs to
        session_id: String,
        /// Error text shown in the transcript
        error: String,
    },
    /// The session was deleted while the request was in flight
    Discarded,
    /// The controller was shut down while the request was in flight
    Cancelled,
}

/// Result of clear, rename and delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Preconditions not met; nothing was sent
    Rejected,
    /// The backend acknowledged the change
    Done,
    /// The backend call failed
    Failed,
}

/// First half of a send: the optimistic write and the request to make
#[derive(Debug, Clone)]
pub struct PendingSend {
    session_id: String,
    index: usize,
    epoch: u64,
    mutation: u64,
    create_mutation: Option<u64>,
    request: ChatRequest,
    history: Vec<WireMessage>,
}

impl PendingSend {
    /// Session the message was appended to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Index of the pending user message
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether this send created the session
    pub fn is_new_chat(&self) -> bool {
        self.request.is_new_chat
    }
}

/// Behaviour switches taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Endpoint used for chat turns
    pub transport: ChatTransport,
    /// Play each assistant reply automatically
    pub autoplay: bool,
    /// Largest recording accepted for transcription
    pub max_upload_bytes: usize,
}

impl ControllerOptions {
    /// Options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            transport: config.backend.transport,
            autoplay: config.audio.autoplay,
            max_upload_bytes: config.audio.max_upload_bytes,
        }
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Key identifying one message for playback
pub fn message_key(session_id: &str, index: usize) -> String {
    format!("{}:{}", session_id, index)
}

/// State and operations behind the chat screen
pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    user: Option<User>,
    store: SessionStore,
    cache: Option<SessionCache>,
    log: MutationLog,
    clear_epochs: HashMap<String, u64>,
    notifications: Vec<Notification>,
    scope: CancellationToken,
    tts: TtsPlayer,
    options: ControllerOptions,
}

impl ChatController {
    /// Creates a controller in the welcome state with no sessions
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        sink: Arc<dyn AudioSink>,
        user: Option<User>,
        options: ControllerOptions,
    ) -> Self {
        let scope = CancellationToken::new();
        let tts = TtsPlayer::with_scope(Arc::clone(&backend), sink, scope.child_token());
        Self {
            backend,
            user,
            store: SessionStore::new(),
            cache: None,
            log: MutationLog::new(),
            clear_epochs: HashMap::new(),
            notifications: Vec::new(),
            scope,
            tts,
            options,
        }
    }

    /// Mirrors the session list into `cache` after every successful mutation
    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The signed-in user
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Replaces the signed-in user
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// All sessions in collection order
    pub fn sessions(&self) -> &[Session] {
        self.store.sessions()
    }

    /// The session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The current session, if any
    pub fn current_session(&self) -> Option<&Session> {
        self.store.current()
    }

    /// What the chat pane shows
    pub fn view(&self) -> View {
        self.store.view()
    }

    /// Starter prompts for the welcome screen
    pub fn welcome_suggestions(&self) -> &'static [&'static str] {
        WELCOME_SUGGESTIONS
    }

    /// Log of optimistic writes
    pub fn mutation_log(&self) -> &MutationLog {
        &self.log
    }

    /// Playback state of one message
    pub async fn tts_state(&self, session_id: &str, index: usize) -> TtsState {
        self.tts.state(&message_key(session_id, index)).await
    }

    /// Whether replies are played automatically
    pub fn autoplay(&self) -> bool {
        self.options.autoplay
    }

    /// Turns automatic playback on or off
    pub async fn set_autoplay(&mut self, enabled: bool) {
        self.options.autoplay = enabled;
        if !enabled {
            if let Some(key) = self.tts.autoplay_key().await {
                self.tts.stop(&key).await;
            }
        }
    }

    /// Endpoint used for chat turns
    pub fn transport(&self) -> ChatTransport {
        self.options.transport
    }

    /// Takes the queued notifications
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?level, message = %message, "Notification");
        self.notifications.push(Notification { level, message });
    }

    fn persist(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(self.store.sessions()) {
                tracing::warn!("Failed to mirror sessions: {}", e);
            }
        }
    }

    /// Runs `fut` unless the controller is torn down first
    async fn guarded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.scope.cancelled() => Err(OdiaLinguaError::Cancelled.into()),
            result = fut => result,
        }
    }

    /// Loads the user's sessions, falling back to the local mirror
    ///
    /// Always leaves the controller in the welcome state.
    pub async fn fetch_sessions(&mut self, user_id: &str) -> FetchOutcome {
        self.tts.stop_all().await;
        let backend = Arc::clone(&self.backend);
        match self.guarded(backend.list_sessions(user_id)).await {
            Ok(sessions) => {
                let count = sessions.len();
                self.store.replace_all(sessions);
                self.log.clear();
                self.persist();
                tracing::info!(count, "Loaded sessions");
                FetchOutcome::Loaded(count)
            }
            Err(e) => {
                tracing::error!("Failed to fetch user chats: {}", e);
                self.notify(NotificationLevel::Error, "Could not load your chats.");
                let cached = self
                    .cache
                    .as_ref()
                    .and_then(|c| c.load().unwrap_or_else(|e| {
                        tracing::warn!("Failed to read session mirror: {}", e);
                        None
                    }));
                match cached {
                    Some(sessions) => {
                        let count = sessions.len();
                        self.store.replace_all(sessions);
                        FetchOutcome::Cached(count)
                    }
                    None => {
                        self.store.replace_all(Vec::new());
                        FetchOutcome::Failed
                    }
                }
            }
        }
    }

    /// Appends the user message optimistically and prepares the request
    ///
    /// Returns `None` when the text is blank or no user is signed in. When no
    /// session is current a new one is created with a client-generated id.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }
        let user_id = self.user.as_ref()?.id.clone();

        let is_new_chat = self.store.current_id().is_none();
        let (session_id, create_mutation) = match self.store.current_id() {
            Some(id) => (id.to_string(), None),
            None => {
                let session = Session::optimistic();
                let id = session.id.clone();
                self.store.insert_front(session);
                let mutation = self.log.record(&id, MutationKind::CreateSession);
                (id, Some(mutation))
            }
        };

        let index = self
            .store
            .append(&session_id, Message::user(content).pending())?;
        let mutation = self
            .log
            .record(&session_id, MutationKind::AppendMessage { index });

        let history = match self.options.transport {
            ChatTransport::StreamChat => self
                .store
                .get(&session_id)
                .map(|s| s.messages.iter().map(WireMessage::from).collect())
                .unwrap_or_default(),
            ChatTransport::Chat => Vec::new(),
        };

        tracing::debug!(session_id = %session_id, index, is_new_chat, "Sending message");
        Some(PendingSend {
            request: ChatRequest {
                session_id: session_id.clone(),
                message: content.to_string(),
                user_id,
                is_new_chat,
            },
            epoch: self.clear_epoch(&session_id),
            session_id,
            index,
            mutation,
            create_mutation,
            history,
        })
    }

    /// Performs the network half of a send
    pub async fn dispatch(&self, pending: &PendingSend) -> Result<ChatReply> {
        match self.options.transport {
            ChatTransport::Chat => self.guarded(self.backend.send_message(&pending.request)).await,
            ChatTransport::StreamChat => {
                let request = StreamChatRequest {
                    session_id: pending.session_id.clone(),
                    messages: pending.history.clone(),
                };
                self.guarded(self.backend.stream_chat(&request)).await
            }
        }
    }

    /// Applies the backend's answer to the session it was sent from
    pub async fn complete_send(
        &mut self,
        pending: PendingSend,
        result: Result<ChatReply>,
    ) -> SendOutcome {
        let cancelled = self.scope.is_cancelled()
            || matches!(
                result.as_ref().err().and_then(|e| e.downcast_ref::<OdiaLinguaError>()),
                Some(OdiaLinguaError::Cancelled)
            );
        if cancelled {
            tracing::debug!(session_id = %pending.session_id, "Send cancelled");
            return SendOutcome::Cancelled;
        }

        if self.store.get(&pending.session_id).is_none() {
            tracing::info!(session_id = %pending.session_id, "Session gone, discarding reply");
            self.settle(&pending, result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
            return SendOutcome::Discarded;
        }

        if self.clear_epoch(&pending.session_id) != pending.epoch {
            tracing::info!(session_id = %pending.session_id, "History cleared, discarding reply");
            if result.is_ok() {
                self.store.mark_synced(&pending.session_id);
                self.persist();
            }
            self.settle(&pending, result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
            return SendOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                let id = pending.session_id.clone();
                self.store
                    .set_message_status(&id, pending.index, MessageStatus::Confirmed);
                let reply_index = self.store.append(&id, Message::assistant(reply.response.clone()));
                if let Some(name) = reply.new_name.as_deref().map(str::trim) {
                    if !name.is_empty() {
                        self.store.rename(&id, name);
                    }
                }
                self.store.mark_synced(&id);
                self.settle(&pending, Ok(()));
                self.log.compact();
                self.persist();

                if self.options.autoplay {
                    if let Some(index) = reply_index {
                        self.play_with_mode(&id, index, PlaybackMode::Autoplay).await;
                    }
                }
                SendOutcome::Replied { session_id: id }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(session_id = %pending.session_id, "Send failed: {}", error);
                let id = pending.session_id.clone();
                self.store
                    .set_message_status(&id, pending.index, MessageStatus::Failed);
                self.store.append(&id, Message::error(&error));
                self.settle(&pending, Err(error.clone()));
                self.persist();
                self.notify(NotificationLevel::Error, format!("Error: {}", error));
                SendOutcome::Failed {
                    session_id: id,
                    error,
                }
            }
        }
    }

    /// Settles the log entries a send recorded
    fn settle(&mut self, pending: &PendingSend, result: std::result::Result<(), String>) {
        let ids = std::iter::once(pending.mutation).chain(pending.create_mutation);
        for id in ids {
            match &result {
                Ok(()) => self.log.confirm(id),
                Err(error) => self.log.fail(id, error.as_str()),
            }
        }
    }

    fn clear_epoch(&self, session_id: &str) -> u64 {
        self.clear_epochs.get(session_id).copied().unwrap_or(0)
    }

    /// Sends `text` in the current session (creating one if needed)
    ///
    /// Exactly one assistant message (the reply or an error note) is appended
    /// per accepted send.
    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        let Some(pending) = self.begin_send(text) else {
            return SendOutcome::Rejected;
        };
        let result = self.dispatch(&pending).await;
        self.complete_send(pending, result).await
    }

    /// Empties a session's history once the backend has cleared it
    pub async fn clear_history(&mut self, session_id: &str) -> ActionOutcome {
        if self.store.get(session_id).is_none() {
            return ActionOutcome::Rejected;
        }
        let backend = Arc::clone(&self.backend);
        match self.guarded(backend.clear_history(session_id)).await {
            Ok(()) => {
                if self.store.current_id() == Some(session_id) {
                    self.tts.stop_all().await;
                }
                self.store.clear(session_id);
                *self.clear_epochs.entry(session_id.to_string()).or_insert(0) += 1;
                self.persist();
                self.notify(NotificationLevel::Success, "History cleared.");
                ActionOutcome::Done
            }
            Err(e) => {
                if !is_cancelled(&e) {
                    self.notify(
                        NotificationLevel::Error,
                        format!("Failed to clear history: {}", e),
                    );
                }
                ActionOutcome::Failed
            }
        }
    }

    /// Removes a session locally, then asks the backend to delete it
    ///
    /// A backend failure is reported but the session is not restored.
    pub async fn delete_session(&mut self, session_id: &str) -> ActionOutcome {
        let was_current = self.store.current_id() == Some(session_id);
        if self.store.remove(session_id).is_none() {
            return ActionOutcome::Rejected;
        }
        if was_current {
            self.tts.stop_all().await;
        }
        let mutation = self.log.record(session_id, MutationKind::DeleteSession);
        self.persist();

        let backend = Arc::clone(&self.backend);
        match self.guarded(backend.delete_chat(session_id)).await {
            Ok(()) => {
                self.log.confirm(mutation);
                self.notify(NotificationLevel::Success, "Chat deleted.");
                ActionOutcome::Done
            }
            Err(e) => {
                self.log.fail(mutation, e.to_string());
                if !is_cancelled(&e) {
                    self.notify(
                        NotificationLevel::Error,
                        format!("Failed to delete chat: {}", e),
                    );
                }
                ActionOutcome::Failed
            }
        }
    }

    /// Renames the current session once the backend acknowledges it
    pub async fn rename_session(&mut self, new_name: &str) -> ActionOutcome {
        let name = new_name.trim();
        let Some(session_id) = self.store.current_id().map(str::to_string) else {
            return ActionOutcome::Rejected;
        };
        if name.is_empty() {
            return ActionOutcome::Rejected;
        }

        let backend = Arc::clone(&self.backend);
        match self.guarded(backend.rename_chat(&session_id, name)).await {
            Ok(()) => {
                self.store.rename(&session_id, name);
                self.persist();
                self.notify(NotificationLevel::Success, "Chat renamed.");
                ActionOutcome::Done
            }
            Err(e) => {
                if !is_cancelled(&e) {
                    self.notify(
                        NotificationLevel::Error,
                        format!("Failed to rename chat: {}", e),
                    );
                }
                ActionOutcome::Failed
            }
        }
    }

    /// Makes `session_id` current; returns `false` for unknown ids
    pub async fn select_session(&mut self, session_id: &str) -> bool {
        if self.store.get(session_id).is_none() {
            return false;
        }
        if self.store.current_id() != Some(session_id) {
            self.tts.stop_all().await;
        }
        self.store.select(session_id)
    }

    /// Returns to the welcome state; the next send starts a new session
    pub async fn new_chat(&mut self) {
        self.tts.stop_all().await;
        self.store.deselect();
    }

    /// Asks the backend for a fresh session and selects it
    pub async fn create_remote_session(&mut self) -> Option<String> {
        let backend = Arc::clone(&self.backend);
        match self.guarded(backend.create_session()).await {
            Ok(id) => {
                self.tts.stop_all().await;
                if !self.store.insert_front(Session::new(id.clone(), DEFAULT_SESSION_NAME)) {
                    self.store.select(&id);
                }
                self.persist();
                Some(id)
            }
            Err(e) => {
                if !is_cancelled(&e) {
                    self.notify(
                        NotificationLevel::Error,
                        format!("Could not create a new chat: {}", e),
                    );
                }
                None
            }
        }
    }

    /// Starts or stops playback of message `index` in the current session
    pub async fn play_message(&mut self, index: usize) -> Option<TtsTransition> {
        let session_id = self.store.current_id()?.to_string();
        self.play_with_mode(&session_id, index, PlaybackMode::Manual)
            .await
    }

    async fn play_with_mode(
        &mut self,
        session_id: &str,
        index: usize,
        mode: PlaybackMode,
    ) -> Option<TtsTransition> {
        let text = self
            .store
            .get(session_id)
            .and_then(|s| s.messages.get(index))
            .map(|m| m.content.clone())?;
        let key = message_key(session_id, index);
        match self.tts.toggle(&key, &text, mode).await {
            Ok(transition) => Some(transition),
            Err(e) => {
                tracing::error!("TTS error: {}", e);
                self.notify(NotificationLevel::Error, "Failed to generate audio");
                None
            }
        }
    }

    /// Stops all playback
    pub async fn stop_audio(&self) {
        self.tts.stop_all().await;
    }

    /// Uploads a recording and returns the recognized text
    pub async fn transcribe(&mut self, audio: &AudioBlob) -> Option<String> {
        if let Err(e) = audio.validate_for_upload(self.options.max_upload_bytes) {
            self.notify(NotificationLevel::Error, e.to_string());
            return None;
        }
        let backend = Arc::clone(&self.backend);
        match self.guarded(backend.speech_to_text(audio)).await {
            Ok(t) if t.transcript.trim().is_empty() => {
                self.notify(NotificationLevel::Info, "No speech detected.");
                None
            }
            Ok(t) => {
                tracing::info!(language = ?t.detected_language, "Transcribed recording");
                Some(t.transcript.trim().to_string())
            }
            Err(e) => {
                if !is_cancelled(&e) {
                    self.notify(
                        NotificationLevel::Error,
                        format!("Failed to transcribe audio: {}", e),
                    );
                }
                None
            }
        }
    }

    /// Cancels in-flight requests and stops playback
    pub async fn shutdown(&mut self) {
        self.scope.cancel();
        self.tts.stop_all().await;
        tracing::debug!("Chat controller shut down");
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<OdiaLinguaError>(), Some(OdiaLinguaError::Cancelled))
}
