//! Audio capture and playback
//!
//! - [`recorder`]: microphone recording into a single [`AudioBlob`]
//! - [`capture`]: capture devices the recorder reads from
//! - [`tts`]: per-message text-to-speech playback state
//! - [`sink`]: audio outputs the TTS player plays into

pub mod capture;
pub mod recorder;
pub mod sink;
pub mod tts;

pub use capture::{AudioChunk, CaptureConstraints, CaptureDevice, CaptureStream, CommandCaptureDevice};
pub use recorder::Recorder;
pub use sink::{AudioSink, CommandSink, ScopedAudioFile};
pub use tts::{PlaybackMode, TtsPlayer, TtsState, TtsTransition};

use bytes::Bytes;
use std::path::Path;

use crate::error::{OdiaLinguaError, Result};

/// Mime type assumed when a recording carries none
pub const DEFAULT_RECORDING_MIME: &str = "audio/webm";

/// An encoded audio payload with its mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    /// Encoded audio bytes
    pub data: Bytes,
    /// Mime type such as `audio/wav`
    pub mime_type: String,
}

impl AudioBlob {
    /// Wraps encoded audio
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Reads an audio file, inferring the mime type from its extension
    pub async fn from_file(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        Ok(Self::new(data, mime_for_extension(&ext)))
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the mime type (codec parameters ignored)
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::audio::AudioBlob;
    ///
    /// let blob = AudioBlob::new(vec![1u8], "audio/webm;codecs=opus");
    /// assert_eq!(blob.extension(), "webm");
    /// ```
    pub fn extension(&self) -> &'static str {
        let essence = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "mp4",
            "audio/ogg" => "ogg",
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/flac" => "flac",
            _ => "webm",
        }
    }

    /// Upload file name the backend uses to validate the format
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.extension())
    }

    /// Rejects recordings the speech-to-text endpoint would refuse
    pub fn validate_for_upload(&self, max_bytes: usize) -> Result<()> {
        if self.is_empty() {
            return Err(OdiaLinguaError::Audio("Empty audio file".to_string()).into());
        }
        if self.len() > max_bytes {
            return Err(OdiaLinguaError::Audio(format!(
                "Audio file too large. Maximum size is {}MB",
                max_bytes / (1024 * 1024)
            ))
            .into());
        }
        Ok(())
    }
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "wav" => "audio/wav",
        "mp4" | "m4a" => "audio/mp4",
        "ogg" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        _ => DEFAULT_RECORDING_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(AudioBlob::new(vec![0u8], "audio/wav").extension(), "wav");
        assert_eq!(AudioBlob::new(vec![0u8], "audio/mp4").extension(), "mp4");
        assert_eq!(AudioBlob::new(vec![0u8], "AUDIO/OGG").extension(), "ogg");
        assert_eq!(AudioBlob::new(vec![0u8], "").extension(), "webm");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            AudioBlob::new(vec![0u8], "audio/wav").file_name(),
            "recording.wav"
        );
    }

    #[test]
    fn test_validate_for_upload() {
        let empty = AudioBlob::new(Vec::new(), "audio/wav");
        assert!(empty.validate_for_upload(10).is_err());

        let big = AudioBlob::new(vec![0u8; 11], "audio/wav");
        assert!(big.validate_for_upload(10).is_err());

        let ok = AudioBlob::new(vec![0u8; 10], "audio/wav");
        assert!(ok.validate_for_upload(10).is_ok());
    }

    #[tokio::test]
    async fn test_from_file_infers_mime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("question.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let blob = AudioBlob::from_file(&path).await.unwrap();
        assert_eq!(blob.mime_type, "audio/wav");
        assert_eq!(blob.len(), 4);
    }
}
