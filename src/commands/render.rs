//! Terminal rendering for the chat screen
//!
//! Banners, transcripts, notifications and the session table. Everything
//! here writes to stdout; logs go to stderr.

use chrono::{Local, TimeZone};
use colored::Colorize;
use prettytable::{cell, row, Table};

use crate::audio::TtsState;
use crate::auth::User;
use crate::session::{Message, MessageStatus, Notification, NotificationLevel, Role, Session};
use crate::storage::StoredEntry;

/// Prints the banner shown when the chat opens
pub fn print_welcome_banner(user: &User) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║            OdiaLingua Interactive Chat - Welcome!            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    let who = if user.name.is_empty() {
        user.email.as_str()
    } else {
        user.name.as_str()
    };
    println!("Signed in as {}\n", who.cyan());
    println!("Type '/help' for available commands, 'exit' to quit\n");
}

/// Prints the welcome screen with numbered starter prompts
pub fn print_suggestions(suggestions: &[&str]) {
    println!("{}", "Start a new conversation. Try one of these:".bold());
    for (i, suggestion) in suggestions.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).dimmed(), suggestion);
    }
    println!();
}

/// Picks a starter prompt when the input is a bare suggestion number
///
/// # Examples
///
/// ```
/// use odialingua::commands::render::suggestion_for;
///
/// let suggestions = ["Teach me greetings", "Tell me about Konark"];
/// assert_eq!(suggestion_for("2", &suggestions), Some("Tell me about Konark"));
/// assert_eq!(suggestion_for("7", &suggestions), None);
/// assert_eq!(suggestion_for("hello", &suggestions), None);
/// ```
pub fn suggestion_for<'a>(input: &str, suggestions: &[&'a str]) -> Option<&'a str> {
    let n: usize = input.trim().parse().ok()?;
    n.checked_sub(1).and_then(|i| suggestions.get(i)).copied()
}

/// Prompt string reflecting the current session and recording state
pub fn format_prompt(session_name: &str, recording: bool) -> String {
    let name = session_name.green();
    if recording {
        format!("[{}]{} >> ", name, "[REC]".red().bold())
    } else {
        format!("[{}] >> ", name)
    }
}

fn role_label(message: &Message) -> colored::ColoredString {
    match message.role {
        Role::User => "You".cyan().bold(),
        Role::Assistant if message.content.starts_with("Error: ") => "Assistant".red().bold(),
        Role::Assistant => "Assistant".magenta().bold(),
    }
}

fn status_suffix(status: MessageStatus) -> &'static str {
    match status {
        MessageStatus::Confirmed => "",
        MessageStatus::Pending => " (sending)",
        MessageStatus::Failed => " (not delivered)",
    }
}

/// Prints one message; `number` is the 1-based position `/play` accepts
pub fn print_message(number: usize, message: &Message) {
    let time = message
        .timestamp
        .and_then(|ts| Local.timestamp_millis_opt(ts).single())
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{} {}{} {}",
        format!("[{}]", number).dimmed(),
        role_label(message),
        status_suffix(message.status).yellow(),
        time.dimmed()
    );
    println!("{}\n", message.content);
}

/// Prints a whole transcript under the session name
pub fn print_transcript(session: &Session) {
    println!("\n{}", format!("── {} ──", session.name).bold());
    if session.messages.is_empty() {
        println!("{}\n", "No messages yet.".dimmed());
        return;
    }
    println!();
    for (i, message) in session.messages.iter().enumerate() {
        print_message(i + 1, message);
    }
}

/// Prints queued notifications, colored by severity
pub fn print_notifications(notifications: Vec<Notification>) {
    for note in notifications {
        match note.level {
            NotificationLevel::Info => println!("{}", note.message.blue()),
            NotificationLevel::Success => println!("{}", note.message.green()),
            NotificationLevel::Error => eprintln!("{}", note.message.red()),
        }
    }
}

/// Short label for a playback state
pub fn tts_label(state: TtsState) -> &'static str {
    match state {
        TtsState::Idle => "stopped",
        TtsState::Loading => "loading audio...",
        TtsState::Playing => "playing",
    }
}

fn format_millis(ts: Option<i64>) -> String {
    ts.and_then(|ts| Local.timestamp_millis_opt(ts).single())
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Builds the session listing; `sessions` is already in display order
pub fn session_table(sessions: &[&Session], current: Option<&str>) -> Table {
    let mut table = Table::new();
    table.add_row(row!["#", "Name", "Messages", "Last updated", "Id"]);
    for (i, session) in sessions.iter().enumerate() {
        let marker = if Some(session.id.as_str()) == current {
            format!("*{}", i + 1)
        } else {
            (i + 1).to_string()
        };
        table.add_row(row![
            marker,
            session.name,
            session.messages.len(),
            format_millis(session.last_updated.or(session.created_at)),
            session.id
        ]);
    }
    table
}

/// Snapshot shown by `/status`
#[derive(Debug, Clone)]
pub struct StatusSnapshot<'a> {
    /// Current session, if any
    pub session: Option<&'a Session>,
    /// Number of sessions loaded
    pub session_count: usize,
    /// Whether replies are played automatically
    pub autoplay: bool,
    /// Chat endpoint in use
    pub transport: &'a str,
    /// Recording elapsed seconds, when recording
    pub recording_secs: Option<u64>,
    /// Latest input level
    pub level: f32,
    /// Sessions with undelivered writes
    pub diverged: Vec<String>,
    /// Local storage keys
    pub stored: Vec<StoredEntry>,
}

/// Prints the `/status` display
pub fn print_status_display(status: &StatusSnapshot<'_>) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                   OdiaLingua Session Status                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    match status.session {
        Some(session) => {
            println!("Current chat:      {} ({})", session.name.green(), session.id);
            println!("Messages:          {}", session.messages.len());
        }
        None => println!("Current chat:      {}", "none (welcome screen)".dimmed()),
    }
    println!("Chats loaded:      {}", status.session_count);
    println!("Transport:         {}", status.transport);
    println!(
        "Autoplay:          {}",
        if status.autoplay {
            "on".green()
        } else {
            "off".dimmed()
        }
    );
    match status.recording_secs {
        Some(secs) => println!(
            "Recording:         {} {}s, level {:.0}%",
            "●".red(),
            secs,
            status.level * 100.0
        ),
        None => println!("Recording:         {}", "idle".dimmed()),
    }
    if !status.diverged.is_empty() {
        println!(
            "Unsynced chats:    {}",
            status.diverged.join(", ").yellow()
        );
    }
    for entry in &status.stored {
        println!(
            "Stored '{}':{}{} bytes, {}",
            entry.key,
            " ".repeat(10usize.saturating_sub(entry.key.len())),
            entry.size,
            entry.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    println!();
}
