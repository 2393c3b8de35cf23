//! Command-line interface definition for OdiaLingua
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, session listing, authentication
//! and one-shot speech conversions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OdiaLingua - talk to the OdiaLingua assistant from your terminal
///
/// Chat about Odia language, culture and history, listen to replies and
/// dictate questions with your microphone.
#[derive(Parser, Debug, Clone)]
#[command(name = "odialingua")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the local storage database path
    #[arg(long, env = "ODIALINGUA_STORAGE_DB")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for OdiaLingua
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Open an existing session instead of the welcome screen
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List your chat sessions
    Sessions {
        /// Print sessions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with Google
    ///
    /// Without arguments this prints the Google sign-in URL. After signing in,
    /// run it again with `--session-secret` to store the session.
    Login {
        /// Session secret returned by the identity service
        #[arg(long)]
        session_secret: Option<String>,
    },

    /// Sign out and forget cached chats
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Synthesize speech for a piece of text
    Speak {
        /// Text to speak
        #[arg(short, long)]
        text: String,

        /// Write the audio to this file instead of playing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file to upload
        file: PathBuf,
    },

    /// Check that the backend is reachable
    Health,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            storage_path: None,
            command: Commands::Whoami,
        }
    }
}
