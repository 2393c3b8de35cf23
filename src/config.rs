//! Configuration management for OdiaLingua
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{OdiaLinguaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for OdiaLingua
///
/// Holds everything the client needs to reach the chat backend and the
/// identity service, plus audio and local storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Appwrite identity service configuration
    #[serde(default)]
    pub appwrite: AppwriteConfig,
    /// Recording and playback configuration
    #[serde(default)]
    pub audio: AudioConfig,
    /// Local storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Which backend endpoint carries chat turns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatTransport {
    /// `POST /chat` with a single message; the backend keeps the history
    #[default]
    Chat,
    /// `POST /stream-chat` with the full message history
    StreamChat,
}

impl ChatTransport {
    /// Parse a transport name as used in config files and env vars
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "chat" => Ok(Self::Chat),
            "stream_chat" => Ok(Self::StreamChat),
            other => Err(format!("Unknown chat transport: {}", other)),
        }
    }
}

/// Chat backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend (no trailing slash required)
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,

    /// Endpoint used for chat turns
    #[serde(default)]
    pub transport: ChatTransport,
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_backend_timeout() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_seconds: default_backend_timeout(),
            transport: ChatTransport::default(),
        }
    }
}

/// Appwrite identity service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppwriteConfig {
    /// Appwrite API endpoint, e.g. `https://cloud.appwrite.io/v1`
    #[serde(default = "default_appwrite_endpoint")]
    pub endpoint: String,

    /// Appwrite project id
    #[serde(default)]
    pub project_id: String,

    /// Where Appwrite redirects after a successful OAuth login
    #[serde(default = "default_redirect_success")]
    pub redirect_success: String,

    /// Where Appwrite redirects after a failed OAuth login
    #[serde(default = "default_redirect_failure")]
    pub redirect_failure: String,
}

fn default_appwrite_endpoint() -> String {
    "https://cloud.appwrite.io/v1".to_string()
}

fn default_redirect_success() -> String {
    "http://localhost:5173/chat".to_string()
}

fn default_redirect_failure() -> String {
    "http://localhost:5173/login".to_string()
}

impl Default for AppwriteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_appwrite_endpoint(),
            project_id: String::new(),
            redirect_success: default_redirect_success(),
            redirect_failure: default_redirect_failure(),
        }
    }
}

/// Recording and playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Play every assistant reply automatically
    #[serde(default)]
    pub autoplay: bool,

    /// Program (and arguments) used to play an audio file; the file path is appended
    #[serde(default = "default_player_command")]
    pub player_command: Vec<String>,

    /// Program (and arguments) that writes microphone audio to stdout
    #[serde(default = "default_capture_command")]
    pub capture_command: Vec<String>,

    /// Largest recording accepted for transcription (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_player_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["afplay".to_string()]
    } else {
        vec!["aplay".to_string(), "-q".to_string()]
    }
}

fn default_capture_command() -> Vec<String> {
    [
        "arecord", "-q", "-f", "S16_LE", "-r", "16000", "-c", "1", "-t", "wav", "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024 // 10 MB
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            player_command: default_player_command(),
            capture_command: default_capture_command(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OdiaLinguaError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| OdiaLinguaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("ODIALINGUA_BACKEND_URL") {
            self.backend.url = url;
        }

        if let Ok(timeout) = std::env::var("ODIALINGUA_BACKEND_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid ODIALINGUA_BACKEND_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(transport) = std::env::var("ODIALINGUA_TRANSPORT") {
            match ChatTransport::parse_str(&transport) {
                Ok(t) => self.backend.transport = t,
                Err(e) => tracing::warn!("{}, keeping {:?}", e, self.backend.transport),
            }
        }

        if let Ok(endpoint) = std::env::var("ODIALINGUA_APPWRITE_ENDPOINT") {
            self.appwrite.endpoint = endpoint;
        }

        if let Ok(project_id) = std::env::var("ODIALINGUA_APPWRITE_PROJECT_ID") {
            self.appwrite.project_id = project_id;
        }

        if let Ok(autoplay) = std::env::var("ODIALINGUA_AUTOPLAY") {
            match autoplay.parse::<bool>() {
                Ok(v) => {
                    self.audio.autoplay = v;
                    tracing::debug!(autoplay = v, "Env override: ODIALINGUA_AUTOPLAY");
                }
                Err(_) => tracing::warn!("Invalid value for ODIALINGUA_AUTOPLAY: {}", autoplay),
            }
        }

        if let Ok(db_path) = std::env::var("ODIALINGUA_STORAGE_DB") {
            self.storage.path = Some(PathBuf::from(db_path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(path) = &cli.storage_path {
            tracing::info!("Using storage DB override from CLI: {}", path);
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let backend = url::Url::parse(&self.backend.url).map_err(|e| {
            OdiaLinguaError::Config(format!("Invalid backend.url {}: {}", self.backend.url, e))
        })?;
        if !matches!(backend.scheme(), "http" | "https") {
            return Err(OdiaLinguaError::Config(format!(
                "backend.url must use http or https, got {}",
                backend.scheme()
            ))
            .into());
        }

        if self.backend.timeout_seconds == 0 {
            return Err(OdiaLinguaError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        url::Url::parse(&self.appwrite.endpoint).map_err(|e| {
            OdiaLinguaError::Config(format!(
                "Invalid appwrite.endpoint {}: {}",
                self.appwrite.endpoint, e
            ))
        })?;

        if self.audio.player_command.is_empty() {
            return Err(
                OdiaLinguaError::Config("audio.player_command cannot be empty".to_string()).into(),
            );
        }

        if self.audio.capture_command.is_empty() {
            return Err(
                OdiaLinguaError::Config("audio.capture_command cannot be empty".to_string()).into(),
            );
        }

        if self.audio.max_upload_bytes == 0 {
            return Err(OdiaLinguaError::Config(
                "audio.max_upload_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
