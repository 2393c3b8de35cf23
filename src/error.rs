//! Error types for OdiaLingua
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for OdiaLingua operations
///
/// This enum encompasses all possible errors that can occur while loading
/// configuration, talking to the chat backend or the identity service,
/// persisting local state, and capturing or playing audio.
#[derive(Error, Debug)]
pub enum OdiaLinguaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat backend answered with a non-success status
    ///
    /// `message` carries the backend's `detail` field when present.
    #[error("{message}")]
    Backend {
        /// HTTP status code returned by the backend
        status: u16,
        /// Human readable failure description
        message: String,
    },

    /// Authentication errors (missing session, rejected OAuth flow, etc.)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Local storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Audio payload errors (empty recording, oversized upload, playback)
    #[error("Audio error: {0}")]
    Audio(String),

    /// Microphone acquisition errors
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Text-to-speech errors
    #[error("Text-to-speech error: {0}")]
    Tts(String),

    /// The owning view or session was torn down before the operation finished
    #[error("Operation cancelled")]
    Cancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Microphone acquisition failures
///
/// Permission denial and a missing device are kept apart so the user can be
/// told which one to fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The operating system refused access to the microphone
    #[error("Microphone permission denied. Please allow microphone access and try again.")]
    PermissionDenied,

    /// No capture device (or capture program) exists
    #[error("No microphone found. Please connect a microphone and try again.")]
    DeviceNotFound,

    /// Any other acquisition failure
    #[error("Microphone access denied or not available")]
    Unavailable(String),
}

impl OdiaLinguaError {
    /// Build a backend error from a status code and an optional detail
    ///
    /// # Examples
    ///
    /// ```
    /// use odialingua::error::OdiaLinguaError;
    ///
    /// let err = OdiaLinguaError::backend(500, None);
    /// assert_eq!(err.to_string(), "Server error: 500");
    ///
    /// let err = OdiaLinguaError::backend(404, Some("Chat session not found: s1".into()));
    /// assert_eq!(err.to_string(), "Chat session not found: s1");
    /// ```
    pub fn backend(status: u16, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Server error: {}", status));
        Self::Backend { status, message }
    }
}

/// Result type alias for OdiaLingua operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = OdiaLinguaError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_backend_error_without_detail() {
        let error = OdiaLinguaError::backend(500, None);
        assert_eq!(error.to_string(), "Server error: 500");
        assert!(matches!(error, OdiaLinguaError::Backend { status: 500, .. }));
    }

    #[test]
    fn test_backend_error_blank_detail_falls_back() {
        let error = OdiaLinguaError::backend(502, Some("   ".to_string()));
        assert_eq!(error.to_string(), "Server error: 502");
    }

    #[test]
    fn test_backend_error_with_detail() {
        let error = OdiaLinguaError::backend(400, Some("Empty audio file".to_string()));
        assert_eq!(error.to_string(), "Empty audio file");
    }

    #[test]
    fn test_capture_errors_are_distinguishable() {
        let denied = OdiaLinguaError::from(CaptureError::PermissionDenied).to_string();
        let missing = OdiaLinguaError::from(CaptureError::DeviceNotFound).to_string();
        assert!(denied.contains("permission denied"));
        assert!(missing.contains("No microphone found"));
        assert_ne!(denied, missing);
    }

    #[test]
    fn test_capture_unavailable_display() {
        let error = CaptureError::Unavailable("busy".to_string());
        assert_eq!(error.to_string(), "Microphone access denied or not available");
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(OdiaLinguaError::Cancelled.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: OdiaLinguaError = io_error.into();
        assert!(matches!(error, OdiaLinguaError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: OdiaLinguaError = json_error.into();
        assert!(matches!(error, OdiaLinguaError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: OdiaLinguaError = yaml_error.into();
        assert!(matches!(error, OdiaLinguaError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OdiaLinguaError>();
    }
}
