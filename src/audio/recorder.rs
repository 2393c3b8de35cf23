//! Microphone recorder
//!
//! A [`Recorder`] opens its [`CaptureDevice`] on `start`, collects chunks on
//! a background task, and on `stop` assembles them into one [`AudioBlob`].
//! The live input level is exposed for a meter while recording.

use bytes::{Bytes, BytesMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioBlob, CaptureConstraints, CaptureDevice, CaptureStream, DEFAULT_RECORDING_MIME};
use crate::error::{OdiaLinguaError, Result};

struct Captured {
    chunks: Vec<Bytes>,
    mime_type: Option<String>,
}

struct Active {
    stop: CancellationToken,
    task: JoinHandle<Captured>,
    started: Instant,
}

/// Records from a capture device into a single clip
pub struct Recorder {
    device: Arc<dyn CaptureDevice>,
    constraints: CaptureConstraints,
    level: Arc<AtomicU32>,
    active: Option<Active>,
}

impl Recorder {
    /// Creates an idle recorder requesting speech constraints
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self::with_constraints(device, CaptureConstraints::speech())
    }

    /// Creates an idle recorder with explicit constraints
    pub fn with_constraints(device: Arc<dyn CaptureDevice>, constraints: CaptureConstraints) -> Self {
        Self {
            device,
            constraints,
            level: Arc::new(AtomicU32::new(0)),
            active: None,
        }
    }

    /// Whether a recording is in progress
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Latest input level in `[0.0, 1.0]`; zero when idle
    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    /// Time since `start`, while recording
    pub fn elapsed(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.started.elapsed())
    }

    /// Opens the device and starts collecting audio
    ///
    /// # Errors
    ///
    /// Fails when a recording is already running or the microphone cannot
    /// be opened; the latter surfaces as [`OdiaLinguaError::Capture`].
    pub async fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Err(OdiaLinguaError::Audio("Recording already in progress".to_string()).into());
        }

        let stream = self
            .device
            .open(&self.constraints)
            .await
            .map_err(OdiaLinguaError::from)?;

        self.level.store(0f32.to_bits(), Ordering::Relaxed);
        let stop = CancellationToken::new();
        let task = tokio::spawn(collect(stream, stop.clone(), Arc::clone(&self.level)));
        self.active = Some(Active {
            stop,
            task,
            started: Instant::now(),
        });
        tracing::info!("Recording started");
        Ok(())
    }

    /// Stops recording and returns the clip, or `None` if nothing was captured
    pub async fn stop(&mut self) -> Result<Option<AudioBlob>> {
        let Some(captured) = self.finish().await? else {
            return Ok(None);
        };

        let total: usize = captured.chunks.iter().map(Bytes::len).sum();
        if total == 0 {
            tracing::info!("Recording stopped with no audio");
            return Ok(None);
        }

        let mut data = BytesMut::with_capacity(total);
        for chunk in &captured.chunks {
            data.extend_from_slice(chunk);
        }
        let mime_type = captured
            .mime_type
            .unwrap_or_else(|| DEFAULT_RECORDING_MIME.to_string());
        tracing::info!(bytes = total, mime = %mime_type, "Recording stopped");
        Ok(Some(AudioBlob::new(data.freeze(), mime_type)))
    }

    /// Stops recording and discards whatever was captured
    pub async fn cancel(&mut self) {
        match self.finish().await {
            Ok(Some(_)) => tracing::info!("Recording discarded"),
            Ok(None) => {}
            Err(e) => tracing::warn!("Recording task failed: {}", e),
        }
    }

    async fn finish(&mut self) -> Result<Option<Captured>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        active.stop.cancel();
        let captured = active
            .task
            .await
            .map_err(|e| OdiaLinguaError::Audio(format!("Recording task failed: {}", e)))?;
        self.level.store(0f32.to_bits(), Ordering::Relaxed);
        Ok(Some(captured))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.stop.cancel();
        }
    }
}

async fn collect(
    mut stream: Box<dyn CaptureStream>,
    stop: CancellationToken,
    level: Arc<AtomicU32>,
) -> Captured {
    let mut captured = Captured {
        chunks: Vec::new(),
        mime_type: None,
    };

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            next = stream.next_chunk() => match next {
                Ok(Some(chunk)) => {
                    if let Some(l) = chunk.level {
                        level.store(l.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
                    }
                    captured.mime_type.get_or_insert(chunk.mime_type);
                    if !chunk.data.is_empty() {
                        captured.chunks.push(chunk.data);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Capture stream failed: {}", e);
                    break;
                }
            },
        }
    }

    stream.close().await;
    captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use crate::error::CaptureError;
    use crate::test_utils::FakeCaptureDevice;

    fn chunk(data: &[u8], level: f32) -> AudioChunk {
        AudioChunk {
            data: Bytes::copy_from_slice(data),
            mime_type: "audio/ogg".to_string(),
            level: Some(level),
        }
    }

    #[tokio::test]
    async fn test_record_and_stop_joins_chunks() {
        let device = Arc::new(FakeCaptureDevice::with_chunks(vec![
            chunk(b"ab", 0.25),
            chunk(b"cd", 0.5),
        ]));
        let mut recorder = Recorder::new(device.clone());
        recorder.start().await.unwrap();
        assert!(recorder.is_recording());

        device.wait_drained().await;
        assert!((recorder.level() - 0.5).abs() < f32::EPSILON);

        let blob = recorder.stop().await.unwrap().unwrap();
        assert_eq!(&blob.data[..], b"abcd");
        assert_eq!(blob.mime_type, "audio/ogg");
        assert!(!recorder.is_recording());
        assert_eq!(recorder.level(), 0.0);
        assert!(device.closed());
    }

    #[tokio::test]
    async fn test_stop_without_audio_returns_none() {
        let device = Arc::new(FakeCaptureDevice::with_chunks(Vec::new()));
        let mut recorder = Recorder::new(device);
        recorder.start().await.unwrap();
        assert!(recorder.stop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_when_idle_returns_none() {
        let mut recorder = Recorder::new(Arc::new(FakeCaptureDevice::with_chunks(Vec::new())));
        assert!(recorder.stop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let device = Arc::new(FakeCaptureDevice::with_chunks(Vec::new()));
        let mut recorder = Recorder::new(device);
        recorder.start().await.unwrap();
        let err = recorder.start().await.unwrap_err();
        assert!(err.to_string().contains("already in progress"));
        recorder.cancel().await;
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_permission_denied_surfaces() {
        let device = Arc::new(FakeCaptureDevice::failing(CaptureError::PermissionDenied));
        let mut recorder = Recorder::new(device);
        let err = recorder.start().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OdiaLinguaError>(),
            Some(OdiaLinguaError::Capture(CaptureError::PermissionDenied))
        ));
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_cancel_discards_audio() {
        let device = Arc::new(FakeCaptureDevice::with_chunks(vec![chunk(b"xy", 0.1)]));
        let mut recorder = Recorder::new(device.clone());
        recorder.start().await.unwrap();
        device.wait_drained().await;
        recorder.cancel().await;
        assert!(recorder.stop().await.unwrap().is_none());
    }
}
