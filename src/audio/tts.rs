//! Per-message text-to-speech playback
//!
//! Each message key moves through `Idle -> Loading -> Playing -> Idle`. A
//! toggle while loading is ignored, so a message never has two synthesis
//! requests in flight. A toggle while playing stops the clip. At most one
//! track is the autoplay track; starting any other playback stops it.
//!
//! Every request and clip hangs off the player's own cancellation scope:
//! [`TtsPlayer::stop_all`] and dropping the player cancel everything.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioSink;
use crate::backend::ChatBackend;
use crate::error::{OdiaLinguaError, Result};

/// Why a clip is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// The user asked for it
    Manual,
    /// A fresh assistant reply with autoplay enabled
    Autoplay,
}

/// Playback state of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsState {
    /// Nothing requested
    Idle,
    /// Synthesis request in flight
    Loading,
    /// Clip is playing
    Playing,
}

/// Outcome of [`TtsPlayer::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsTransition {
    /// Audio was fetched and playback began
    Started,
    /// The message was playing and has been stopped
    Stopped,
    /// A request for this message is already loading
    Ignored,
    /// The request was cancelled before playback began
    Cancelled,
}

#[derive(Debug)]
enum Phase {
    Loading,
    Playing,
}

#[derive(Debug)]
struct Entry {
    phase: Phase,
    token: CancellationToken,
    generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    autoplay: Option<String>,
    next_generation: u64,
}

impl Inner {
    fn stop(&mut self, key: &str) -> bool {
        if self.autoplay.as_deref() == Some(key) {
            self.autoplay = None;
        }
        match self.entries.remove(key) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops `key` only if it still belongs to `generation`
    fn settle(&mut self, key: &str, generation: u64) {
        if self.entries.get(key).map(|e| e.generation) == Some(generation) {
            self.stop(key);
        }
    }
}

/// Plays synthesized speech for chat messages
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use odialingua::audio::{CommandSink, PlaybackMode, TtsPlayer};
/// use odialingua::backend::HttpBackend;
/// use odialingua::config::BackendConfig;
///
/// # async fn example() -> odialingua::error::Result<()> {
/// let backend = Arc::new(HttpBackend::new(&BackendConfig::default())?);
/// let sink = Arc::new(CommandSink::new(vec!["aplay".into(), "-q".into()]));
/// let player = TtsPlayer::new(backend, sink);
/// player.toggle("s1:1", "ନମସ୍କାର", PlaybackMode::Manual).await?;
/// # Ok(())
/// # }
/// ```
pub struct TtsPlayer {
    backend: Arc<dyn ChatBackend>,
    sink: Arc<dyn AudioSink>,
    inner: Arc<Mutex<Inner>>,
    scope: CancellationToken,
}

impl TtsPlayer {
    /// Creates a player with its own cancellation scope
    pub fn new(backend: Arc<dyn ChatBackend>, sink: Arc<dyn AudioSink>) -> Self {
        Self::with_scope(backend, sink, CancellationToken::new())
    }

    /// Creates a player whose requests are cancelled along with `scope`
    pub fn with_scope(
        backend: Arc<dyn ChatBackend>,
        sink: Arc<dyn AudioSink>,
        scope: CancellationToken,
    ) -> Self {
        Self {
            backend,
            sink,
            inner: Arc::new(Mutex::new(Inner::default())),
            scope,
        }
    }

    /// Current state of `key`
    pub async fn state(&self, key: &str) -> TtsState {
        match self.inner.lock().await.entries.get(key).map(|e| &e.phase) {
            Some(Phase::Loading) => TtsState::Loading,
            Some(Phase::Playing) => TtsState::Playing,
            None => TtsState::Idle,
        }
    }

    /// Key of the current autoplay track, if any
    pub async fn autoplay_key(&self) -> Option<String> {
        self.inner.lock().await.autoplay.clone()
    }

    /// Starts or stops playback of `text` for `key`
    ///
    /// Returns once the audio has been fetched and handed to the sink; the
    /// clip keeps playing in the background.
    ///
    /// # Errors
    ///
    /// Returns the backend error when synthesis fails; the key is back to
    /// [`TtsState::Idle`] in that case.
    pub async fn toggle(&self, key: &str, text: &str, mode: PlaybackMode) -> Result<TtsTransition> {
        let (token, generation) = {
            let mut inner = self.inner.lock().await;
            match inner.entries.get(key).map(|e| &e.phase) {
                Some(Phase::Loading) => return Ok(TtsTransition::Ignored),
                Some(Phase::Playing) => {
                    inner.stop(key);
                    return Ok(TtsTransition::Stopped);
                }
                None => {}
            }

            if let Some(current) = inner.autoplay.take() {
                tracing::debug!(key = %current, "Stopping autoplay track");
                inner.stop(&current);
            }

            inner.next_generation += 1;
            let generation = inner.next_generation;
            let token = self.scope.child_token();
            inner.entries.insert(
                key.to_string(),
                Entry {
                    phase: Phase::Loading,
                    token: token.clone(),
                    generation,
                },
            );
            if mode == PlaybackMode::Autoplay {
                inner.autoplay = Some(key.to_string());
            }
            (token, generation)
        };

        tracing::debug!(key, ?mode, "Requesting speech");
        let fetched = self.backend.text_to_speech(text, &token).await;

        let mut inner = self.inner.lock().await;
        let clip = match fetched {
            Ok(clip) => clip,
            Err(e) => {
                inner.settle(key, generation);
                if matches!(e.downcast_ref::<OdiaLinguaError>(), Some(OdiaLinguaError::Cancelled)) {
                    return Ok(TtsTransition::Cancelled);
                }
                tracing::warn!(key, "Speech synthesis failed: {}", e);
                return Err(e);
            }
        };

        match inner.entries.get_mut(key) {
            Some(entry) if entry.generation == generation && !token.is_cancelled() => {
                entry.phase = Phase::Playing;
            }
            _ => return Ok(TtsTransition::Cancelled),
        }
        drop(inner);

        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.inner);
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.play(clip, token).await {
                tracing::warn!(key = %key, "Playback failed: {}", e);
            }
            state.lock().await.settle(&key, generation);
        });

        Ok(TtsTransition::Started)
    }

    /// Stops `key` whether loading or playing; returns whether it was active
    pub async fn stop(&self, key: &str) -> bool {
        self.inner.lock().await.stop(key)
    }

    /// Stops every request and clip
    pub async fn stop_all(&self) {
        let mut inner = self.inner.lock().await;
        let count = inner.entries.len();
        for (_, entry) in inner.entries.drain() {
            entry.token.cancel();
        }
        inner.autoplay = None;
        if count > 0 {
            tracing::debug!(count, "Stopped all playback");
        }
    }
}

impl Drop for TtsPlayer {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
