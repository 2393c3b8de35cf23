//! Capture devices feeding the recorder
//!
//! A [`CaptureDevice`] opens a [`CaptureStream`] for a set of
//! [`CaptureConstraints`]; the stream yields encoded [`AudioChunk`]s until it
//! is closed. [`CommandCaptureDevice`] drives an external recording program
//! (ALSA's `arecord` by default) and reads its stdout.

use async_trait::async_trait;
use bytes::Bytes;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use crate::error::{CaptureError, Result};

/// 100 ms of 16 kHz, 16-bit mono PCM
const CHUNK_BYTES: usize = 3200;

/// Microphone settings requested for speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Number of channels (mono)
    pub channel_count: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Ask the device for echo cancellation
    pub echo_cancellation: bool,
    /// Ask the device for noise suppression
    pub noise_suppression: bool,
    /// Ask the device for automatic gain control
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    /// Mono 16 kHz with all voice processing enabled
    pub const fn speech() -> Self {
        Self {
            channel_count: 1,
            sample_rate: 16_000,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::speech()
    }
}

/// A slice of encoded audio delivered by a capture stream
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Encoded bytes
    pub data: Bytes,
    /// Mime type of the encoding
    pub mime_type: String,
    /// Loudness of the chunk in `[0.0, 1.0]`, when the device can tell
    pub level: Option<f32>,
}

/// An open microphone stream
#[async_trait]
pub trait CaptureStream: Send {
    /// Waits for the next chunk; `Ok(None)` once the stream has ended
    async fn next_chunk(&mut self) -> Result<Option<AudioChunk>>;

    /// Releases the device
    async fn close(&mut self);
}

/// Something that can open a microphone
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Opens a stream honouring `constraints` as far as the device allows
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Box<dyn CaptureStream>, CaptureError>;
}

/// Records through an external program that writes audio to stdout
///
/// # Examples
///
/// ```no_run
/// use odialingua::audio::{CaptureConstraints, CaptureDevice, CommandCaptureDevice};
///
/// # async fn example() -> Result<(), odialingua::error::CaptureError> {
/// let device = CommandCaptureDevice::new(vec![
///     "arecord".into(), "-q".into(), "-f".into(), "S16_LE".into(),
///     "-r".into(), "16000".into(), "-c".into(), "1".into(),
///     "-t".into(), "wav".into(), "-".into(),
/// ]);
/// let stream = device.open(&CaptureConstraints::speech()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CommandCaptureDevice {
    command: Vec<String>,
    mime_type: String,
}

impl CommandCaptureDevice {
    /// Uses `command` (program followed by arguments); output is taken as WAV
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            mime_type: "audio/wav".to_string(),
        }
    }
}

/// Maps process spawn failures onto the microphone error taxonomy
fn capture_error(err: &std::io::Error) -> CaptureError {
    match err.kind() {
        std::io::ErrorKind::NotFound => CaptureError::DeviceNotFound,
        std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        _ => CaptureError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl CaptureDevice for CommandCaptureDevice {
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> std::result::Result<Box<dyn CaptureStream>, CaptureError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| CaptureError::Unavailable("empty capture command".to_string()))?;

        tracing::debug!(
            program = %program,
            sample_rate = constraints.sample_rate,
            channels = constraints.channel_count,
            "Opening capture command"
        );

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::warn!("Failed to start capture command {}: {}", program, e);
                capture_error(&e)
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Unavailable("capture stdout unavailable".to_string()))?;

        Ok(Box::new(CommandCaptureStream {
            child,
            stdout,
            mime_type: self.mime_type.clone(),
        }))
    }
}

struct CommandCaptureStream {
    child: Child,
    stdout: ChildStdout,
    mime_type: String,
}

#[async_trait]
impl CaptureStream for CommandCaptureStream {
    async fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        let mut buf = vec![0u8; CHUNK_BYTES];
        let n = self.stdout.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        let level = pcm16_level(&buf);
        Ok(Some(AudioChunk {
            data: Bytes::from(buf),
            mime_type: self.mime_type.clone(),
            level: Some(level),
        }))
    }

    async fn close(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!("Capture command already exited: {}", e);
        }
    }
}

/// Mean absolute amplitude of little-endian 16-bit PCM, scaled to `[0.0, 1.0]`
pub fn pcm16_level(bytes: &[u8]) -> f32 {
    let samples = bytes.len() / 2;
    if samples == 0 {
        return 0.0;
    }
    let sum: u64 = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]).unsigned_abs() as u64)
        .sum();
    (sum as f32 / samples as f32 / i16::MAX as f32).min(1.0)
}
