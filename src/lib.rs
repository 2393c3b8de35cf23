//! OdiaLingua - terminal client for the OdiaLingua assistant
//!
//! This library provides the client side of OdiaLingua: signing in, managing
//! chat sessions against the backend, speaking replies aloud and dictating
//! questions through the microphone.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session store, optimistic writes and the chat controller
//! - `backend`: Chat backend abstraction and HTTP client
//! - `auth`: Identity provider, auth gate and session secret storage
//! - `audio`: Microphone recording and text-to-speech playback
//! - `storage`: Local key/value storage mirroring the session list
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use odialingua::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     // Controller usage would go here
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod auth;
pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use backend::{ChatBackend, HttpBackend};
pub use config::Config;
pub use error::{OdiaLinguaError, Result};
pub use session::{ChatController, Message, Role, Session};

#[cfg(test)]
pub mod test_utils;
