//! Audio outputs
//!
//! Playback goes through the [`AudioSink`] trait. [`CommandSink`] writes each
//! clip to a [`ScopedAudioFile`] and hands the path to an external player; the
//! file is removed as soon as the clip finishes, is stopped, or is dropped.

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioBlob;
use crate::error::{OdiaLinguaError, Result};

/// Something that can play an audio clip
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Plays `clip` to completion or until `stop` is cancelled
    ///
    /// Returns `Ok(())` in both cases; errors mean the clip could not be
    /// played at all.
    async fn play(&self, clip: AudioBlob, stop: CancellationToken) -> Result<()>;
}

/// A temporary file holding one audio clip
///
/// The file is deleted when the value is dropped.
#[derive(Debug)]
pub struct ScopedAudioFile {
    file: NamedTempFile,
}

impl ScopedAudioFile {
    /// Writes `clip` to a fresh temporary file named after its mime type
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::audio::{AudioBlob, ScopedAudioFile};
    ///
    /// let clip = AudioBlob::new(vec![1u8, 2, 3], "audio/wav");
    /// let file = ScopedAudioFile::create(&clip).unwrap();
    /// let path = file.path().to_path_buf();
    /// assert!(path.exists());
    /// drop(file);
    /// assert!(!path.exists());
    /// ```
    pub fn create(clip: &AudioBlob) -> Result<Self> {
        let suffix = format!(".{}", clip.extension());
        let mut file = tempfile::Builder::new()
            .prefix("odialingua-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&clip.data)?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Location of the clip on disk
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Plays clips through an external program such as `aplay` or `afplay`
#[derive(Debug, Clone)]
pub struct CommandSink {
    command: Vec<String>,
}

impl CommandSink {
    /// Uses `command` (program followed by arguments); the clip path is appended
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AudioSink for CommandSink {
    async fn play(&self, clip: AudioBlob, stop: CancellationToken) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| OdiaLinguaError::Audio("empty player command".to_string()))?;

        let file = ScopedAudioFile::create(&clip)?;
        tracing::debug!(program = %program, path = %file.path().display(), "Starting playback");

        let mut child = Command::new(program)
            .args(args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OdiaLinguaError::Audio(format!("Failed to start {}: {}", program, e)))?;

        tokio::select! {
            _ = stop.cancelled() => {
                tracing::debug!("Playback stopped");
                if let Err(e) = child.kill().await {
                    tracing::debug!("Player already exited: {}", e);
                }
            }
            status = child.wait() => {
                let status = status?;
                if !status.success() {
                    tracing::warn!(%status, "Player exited with failure");
                }
            }
        }
        drop(file);
        Ok(())
    }
}
