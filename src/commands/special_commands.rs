//! Special commands parser for interactive chat
//!
//! Lines starting with `/` control the session instead of being sent as
//! messages: switching and managing sessions, speech playback, voice
//! recording, status and help. Command words are case-insensitive; arguments
//! keep their case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// How `/switch` names a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// 1-based position in the `/sessions` listing
    Index(usize),
    /// Session id
    Id(String),
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Return to the welcome screen; the next message starts a new chat
    NewChat,

    /// List sessions, most recent first
    ListSessions,

    /// Open another session
    Switch(SessionRef),

    /// Rename the current session
    Rename(String),

    /// Clear the current session's history
    Clear,

    /// Delete the current session
    Delete,

    /// Play (or stop) message `n` of the current transcript, 1-based
    Play(usize),

    /// Stop all playback
    Stop,

    /// Set autoplay; `None` toggles
    Autoplay(Option<bool>),

    /// Start recording from the microphone
    Record,

    /// Stop recording, transcribe and send the text
    SendRecording,

    /// Stop recording and discard it
    CancelRecording,

    /// Show session and audio status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input as a message
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not a valid command.
/// Returns `CommandError::UnsupportedArgument` if a command receives an invalid argument.
/// Returns `CommandError::MissingArgument` if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use odialingua::commands::special_commands::{parse_special_command, SessionRef, SpecialCommand};
///
/// assert_eq!(
///     parse_special_command("/switch 2").unwrap(),
///     SpecialCommand::Switch(SessionRef::Index(2))
/// );
/// assert_eq!(parse_special_command("Namaskar").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((w, r)) => (w.to_lowercase(), r.trim()),
        None => (lower.clone(), ""),
    };

    match (word.as_str(), rest) {
        ("/new", "") => Ok(SpecialCommand::NewChat),
        ("/sessions", "") | ("/chats", "") => Ok(SpecialCommand::ListSessions),

        ("/switch", "") => Err(CommandError::MissingArgument {
            command: "/switch".to_string(),
            usage: "/switch <number|session id>".to_string(),
        }),
        ("/switch", arg) => match arg.parse::<usize>() {
            Ok(0) => Err(CommandError::UnsupportedArgument {
                command: "/switch".to_string(),
                arg: arg.to_string(),
            }),
            Ok(n) => Ok(SpecialCommand::Switch(SessionRef::Index(n))),
            Err(_) => Ok(SpecialCommand::Switch(SessionRef::Id(arg.to_string()))),
        },

        ("/rename", "") => Err(CommandError::MissingArgument {
            command: "/rename".to_string(),
            usage: "/rename <new name>".to_string(),
        }),
        ("/rename", name) => Ok(SpecialCommand::Rename(name.to_string())),

        ("/clear", "") => Ok(SpecialCommand::Clear),
        ("/delete", "") => Ok(SpecialCommand::Delete),

        ("/play", "") => Err(CommandError::MissingArgument {
            command: "/play".to_string(),
            usage: "/play <message number>".to_string(),
        }),
        ("/play", arg) => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(SpecialCommand::Play(n)),
            _ => Err(CommandError::UnsupportedArgument {
                command: "/play".to_string(),
                arg: arg.to_string(),
            }),
        },
        ("/stop", "") => Ok(SpecialCommand::Stop),

        ("/autoplay", "") => Ok(SpecialCommand::Autoplay(None)),
        ("/autoplay", arg) => match arg.to_lowercase().as_str() {
            "on" => Ok(SpecialCommand::Autoplay(Some(true))),
            "off" => Ok(SpecialCommand::Autoplay(Some(false))),
            _ => Err(CommandError::UnsupportedArgument {
                command: "/autoplay".to_string(),
                arg: arg.to_string(),
            }),
        },

        ("/record", "") => Ok(SpecialCommand::Record),
        ("/send-recording", "") | ("/send", "") => Ok(SpecialCommand::SendRecording),
        ("/cancel-recording", "") => Ok(SpecialCommand::CancelRecording),

        ("/status", "") => Ok(SpecialCommand::ShowStatus),
        ("/help", "") | ("/?", "") => Ok(SpecialCommand::Help),

        ("exit", "") | ("quit", "") | ("/exit", "") | ("/quit", "") => Ok(SpecialCommand::Exit),

        (
            "/new" | "/sessions" | "/chats" | "/clear" | "/delete" | "/stop" | "/record"
            | "/send-recording" | "/send" | "/cancel-recording" | "/status" | "/help" | "/?"
            | "/exit" | "/quit",
            arg,
        ) => Err(CommandError::UnsupportedArgument {
            command: word.clone(),
            arg: arg.to_string(),
        }),

        (cmd, _) if cmd.starts_with('/') => Err(CommandError::UnknownCommand(cmd.to_string())),

        _ => Ok(SpecialCommand::None),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /new                 - Start a new chat (shows suggestions)
  /sessions            - List your chats, most recent first
  /switch <n|id>       - Open chat number n from /sessions, or by id
  /rename <name>       - Rename the current chat
  /clear               - Clear the current chat's history
  /delete              - Delete the current chat

SPEECH:
  /play <n>            - Play or stop message n of the current chat
  /stop                - Stop all playback
  /autoplay [on|off]   - Play every reply automatically (no argument toggles)

VOICE INPUT:
  /record              - Start recording from the microphone
  /send-recording      - Stop recording, transcribe and send
  /cancel-recording    - Stop recording and discard it

SESSION INFORMATION:
  /status              - Show the current chat, autoplay and recording state
  /help                - Show this help message

SESSION CONTROL:
  exit                 - Exit interactive mode
  quit                 - Same as exit

NOTES:
  - Commands are case-insensitive
  - Anything not starting with / is sent to the assistant
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewChat);
        assert_eq!(
            parse_special_command("/sessions").unwrap(),
            SpecialCommand::ListSessions
        );
        assert_eq!(parse_special_command("/clear").unwrap(), SpecialCommand::Clear);
        assert_eq!(parse_special_command("/delete").unwrap(), SpecialCommand::Delete);
    }

    #[test]
    fn test_parse_switch_by_index_and_id() {
        assert_eq!(
            parse_special_command("/switch 3").unwrap(),
            SpecialCommand::Switch(SessionRef::Index(3))
        );
        assert_eq!(
            parse_special_command("/switch 9b2e-41AF").unwrap(),
            SpecialCommand::Switch(SessionRef::Id("9b2e-41AF".to_string()))
        );
    }

    #[test]
    fn test_parse_switch_zero_is_unsupported() {
        assert!(matches!(
            parse_special_command("/switch 0"),
            Err(CommandError::UnsupportedArgument { .. })
        ));
    }

    #[test]
    fn test_parse_switch_missing_argument() {
        assert!(matches!(
            parse_special_command("/switch"),
            Err(CommandError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_rename_keeps_case() {
        assert_eq!(
            parse_special_command("/RENAME  Odia Festivals ").unwrap(),
            SpecialCommand::Rename("Odia Festivals".to_string())
        );
    }

    #[test]
    fn test_parse_play() {
        assert_eq!(parse_special_command("/play 2").unwrap(), SpecialCommand::Play(2));
        assert!(parse_special_command("/play 0").is_err());
        assert!(parse_special_command("/play x").is_err());
        assert!(parse_special_command("/play").is_err());
    }

    #[test]
    fn test_parse_autoplay() {
        assert_eq!(
            parse_special_command("/autoplay").unwrap(),
            SpecialCommand::Autoplay(None)
        );
        assert_eq!(
            parse_special_command("/autoplay ON").unwrap(),
            SpecialCommand::Autoplay(Some(true))
        );
        assert_eq!(
            parse_special_command("/autoplay off").unwrap(),
            SpecialCommand::Autoplay(Some(false))
        );
        assert!(parse_special_command("/autoplay maybe").is_err());
    }

    #[test]
    fn test_parse_recording_commands() {
        assert_eq!(parse_special_command("/record").unwrap(), SpecialCommand::Record);
        assert_eq!(
            parse_special_command("/send-recording").unwrap(),
            SpecialCommand::SendRecording
        );
        assert_eq!(
            parse_special_command("/cancel-recording").unwrap(),
            SpecialCommand::CancelRecording
        );
    }

    #[test]
    fn test_parse_exit_variants() {
        for input in ["exit", "quit", "/exit", "/quit", "EXIT"] {
            assert_eq!(parse_special_command(input).unwrap(), SpecialCommand::Exit);
        }
    }

    #[test]
    fn test_parse_regular_text_returns_none() {
        assert_eq!(
            parse_special_command("What is Pana Sankranti?").unwrap(),
            SpecialCommand::None
        );
        assert_eq!(parse_special_command("").unwrap(), SpecialCommand::None);
        assert_eq!(parse_special_command("exit now").unwrap(), SpecialCommand::None);
    }

    #[test]
    fn test_parse_unknown_command_returns_error() {
        let err = parse_special_command("/teleport").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/teleport".to_string()));
        assert!(err.to_string().contains("/help"));
    }

    #[test]
    fn test_parse_argument_to_bare_command_is_unsupported() {
        assert!(matches!(
            parse_special_command("/clear everything"),
            Err(CommandError::UnsupportedArgument { .. })
        ));
    }

    #[test]
    fn test_parse_help_and_status() {
        assert_eq!(parse_special_command("/help").unwrap(), SpecialCommand::Help);
        assert_eq!(parse_special_command("/?").unwrap(), SpecialCommand::Help);
        assert_eq!(parse_special_command("/status").unwrap(), SpecialCommand::ShowStatus);
    }
}
