/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`: Interactive chat
- `sessions`: List the signed-in user's chats
- `auth`: Sign in, sign out and show the current user
- `speech`: One-shot text-to-speech, transcription and health checks

Handlers are thin: they wire configuration into the library components
(backend client, auth provider, chat controller) and print results.
*/

use crate::audio::{AudioSink, CommandSink};
use crate::auth::{
    AppwriteAuth, AuthGate, AuthProvider, GateDecision, KeyringSecretStore, MemorySecretStore,
    SecretStore, User,
};
use crate::backend::{ChatBackend, HttpBackend};
use crate::config::Config;
use crate::error::{OdiaLinguaError, Result};
use crate::session::{ChatController, ControllerOptions};
use crate::storage::{LocalStore, SessionCache};
use std::sync::Arc;

// Terminal rendering helpers
pub mod render;

// Slash command parser for the interactive chat
pub mod special_commands;

/// Environment variable holding a session secret to use instead of the keyring
pub const SESSION_SECRET_ENV: &str = "ODIALINGUA_SESSION_SECRET";

/// Where the Appwrite session secret is read from
///
/// A secret in `ODIALINGUA_SESSION_SECRET` is held in memory for this process
/// only; otherwise the OS keyring is used.
pub fn secret_store(config: &Config) -> Arc<dyn SecretStore> {
    match std::env::var(SESSION_SECRET_ENV) {
        Ok(secret) if !secret.trim().is_empty() => {
            tracing::debug!("Using session secret from {}", SESSION_SECRET_ENV);
            Arc::new(MemorySecretStore::with_secret(
                &config.appwrite.project_id,
                secret.trim(),
            ))
        }
        _ => Arc::new(KeyringSecretStore),
    }
}

/// Builds the Appwrite client for `config`
pub fn build_auth(config: &Config) -> Result<AppwriteAuth> {
    AppwriteAuth::new(&config.appwrite, secret_store(config))
}

/// Resolves the signed-in user or fails with a hint to sign in
pub async fn require_user(provider: &dyn AuthProvider) -> Result<User> {
    match AuthGate::check(provider).await {
        GateDecision::Allow(user) => Ok(user),
        GateDecision::RedirectToLogin => Err(OdiaLinguaError::Auth(
            "Not signed in. Run `odialingua login` first.".to_string(),
        )
        .into()),
    }
}

fn open_store(config: &Config) -> Result<LocalStore> {
    LocalStore::open(config.storage.path.as_deref())
}

fn build_controller(config: &Config, user: &User, store: &LocalStore) -> Result<ChatController> {
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(&config.backend)?);
    let sink: Arc<dyn AudioSink> = Arc::new(CommandSink::new(config.audio.player_command.clone()));
    Ok(ChatController::new(
        backend,
        sink,
        Some(user.clone()),
        ControllerOptions::from_config(config),
    )
    .with_cache(SessionCache::new(store.clone())))
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Loads the user's chats, then runs a readline loop: plain lines are
    //! sent to the assistant, lines starting with `/` drive the session,
    //! playback and recording.

    use super::*;
    use crate::audio::{CommandCaptureDevice, Recorder, TtsTransition};
    use crate::commands::special_commands::{
        parse_special_command, print_help, SessionRef, SpecialCommand,
    };
    use crate::config::ChatTransport;
    use crate::session::{ActionOutcome, FetchOutcome, SendOutcome, View};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `session` - Optional session id to open instead of the welcome screen
    ///
    /// # Errors
    ///
    /// Fails when no user is signed in or the terminal cannot be set up.
    pub async fn run_chat(config: Config, session: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let auth = build_auth(&config)?;
        let user = require_user(&auth).await?;
        let store = open_store(&config)?;
        let mut controller = build_controller(&config, &user, &store)?;
        let mut recorder = Recorder::new(Arc::new(CommandCaptureDevice::new(
            config.audio.capture_command.clone(),
        )));

        render::print_welcome_banner(&user);

        match controller.fetch_sessions(&user.id).await {
            FetchOutcome::Loaded(count) => tracing::debug!(count, "Chats loaded"),
            FetchOutcome::Cached(count) => {
                println!("{}", format!("Showing {} saved chats.", count).yellow())
            }
            FetchOutcome::Failed => {}
        }
        render::print_notifications(controller.drain_notifications());

        if let Some(id) = session {
            if controller.select_session(&id).await {
                if let Some(current) = controller.current_session() {
                    render::print_transcript(current);
                }
            } else {
                eprintln!("Chat {} not found\n", id);
            }
        }
        if controller.view() == View::Welcome {
            render::print_suggestions(controller.welcome_suggestions());
        }

        let mut rl = DefaultEditor::new()?;

        loop {
            let prompt = render::format_prompt(
                controller.store().current_name(),
                recorder.is_recording(),
            );
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e);
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {}
                        command => {
                            handle_command(&mut controller, &mut recorder, &store, command).await;
                            render::print_notifications(controller.drain_notifications());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)?;

                    let text = if controller.view() == View::Welcome {
                        match render::suggestion_for(trimmed, controller.welcome_suggestions()) {
                            Some(suggestion) => {
                                println!("{} {}", "You:".cyan().bold(), suggestion);
                                suggestion
                            }
                            None => trimmed,
                        }
                    } else {
                        trimmed
                    };
                    send_and_print(&mut controller, text).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        recorder.cancel().await;
        controller.shutdown().await;
        println!("Goodbye!");
        Ok(())
    }

    async fn send_and_print(controller: &mut ChatController, text: &str) {
        println!("{}", "Thinking...".dimmed());
        match controller.send_message(text).await {
            SendOutcome::Replied { session_id } | SendOutcome::Failed { session_id, .. } => {
                if let Some(session) = controller.store().get(&session_id) {
                    if let Some(reply) = session.messages.last() {
                        render::print_message(session.messages.len(), reply);
                    }
                }
            }
            SendOutcome::Rejected => tracing::debug!("Empty message ignored"),
            SendOutcome::Discarded | SendOutcome::Cancelled => {}
        }
        render::print_notifications(controller.drain_notifications());
    }

    fn transport_name(transport: ChatTransport) -> &'static str {
        match transport {
            ChatTransport::Chat => "/chat",
            ChatTransport::StreamChat => "/stream-chat",
        }
    }

    /// Resolves a `/switch` argument against the `/sessions` listing order
    fn resolve_session(controller: &ChatController, target: SessionRef) -> Option<String> {
        match target {
            SessionRef::Index(n) => controller
                .store()
                .ordered_by_recency()
                .get(n.saturating_sub(1))
                .map(|s| s.id.clone()),
            SessionRef::Id(id) => Some(id),
        }
    }

    fn print_current_or_welcome(controller: &ChatController) {
        match controller.current_session() {
            Some(session) => render::print_transcript(session),
            None => render::print_suggestions(controller.welcome_suggestions()),
        }
    }

    async fn handle_command(
        controller: &mut ChatController,
        recorder: &mut Recorder,
        store: &LocalStore,
        command: SpecialCommand,
    ) {
        match command {
            SpecialCommand::NewChat => {
                controller.new_chat().await;
                render::print_suggestions(controller.welcome_suggestions());
            }
            SpecialCommand::ListSessions => {
                if controller.sessions().is_empty() {
                    println!("No chats yet.\n");
                } else {
                    let ordered = controller.store().ordered_by_recency();
                    render::session_table(&ordered, controller.store().current_id()).printstd();
                    println!();
                }
            }
            SpecialCommand::Switch(target) => {
                let selected = match resolve_session(controller, target) {
                    Some(id) => controller.select_session(&id).await,
                    None => false,
                };
                if selected {
                    print_current_or_welcome(controller);
                } else {
                    eprintln!("No such chat. Use /sessions to list your chats.\n");
                }
            }
            SpecialCommand::Rename(name) => {
                if controller.rename_session(&name).await == ActionOutcome::Rejected {
                    eprintln!("Open a chat first to rename it.\n");
                }
            }
            SpecialCommand::Clear => match controller.store().current_id().map(str::to_string) {
                Some(id) => {
                    controller.clear_history(&id).await;
                }
                None => eprintln!("No chat is open.\n"),
            },
            SpecialCommand::Delete => match controller.store().current_id().map(str::to_string) {
                Some(id) => {
                    if controller.delete_session(&id).await != ActionOutcome::Rejected {
                        print_current_or_welcome(controller);
                    }
                }
                None => eprintln!("No chat is open.\n"),
            },
            SpecialCommand::Play(number) => match controller.play_message(number - 1).await {
                Some(TtsTransition::Started) => println!("Playing message {}", number),
                Some(TtsTransition::Stopped) => println!("Stopped message {}", number),
                Some(TtsTransition::Ignored) => {
                    println!("Audio for message {} is still loading", number)
                }
                Some(TtsTransition::Cancelled) => {}
                None => {
                    let exists = controller
                        .current_session()
                        .is_some_and(|s| number <= s.messages.len());
                    if !exists {
                        eprintln!("No message {} in this chat.\n", number);
                    }
                }
            },
            SpecialCommand::Stop => controller.stop_audio().await,
            SpecialCommand::Autoplay(setting) => {
                let enabled = setting.unwrap_or(!controller.autoplay());
                controller.set_autoplay(enabled).await;
                println!("Autoplay {}\n", if enabled { "on" } else { "off" });
            }
            SpecialCommand::Record => match recorder.start().await {
                Ok(()) => println!(
                    "{} Recording... type /send-recording to send or /cancel-recording to discard\n",
                    "●".red()
                ),
                Err(e) => eprintln!("{}\n", e),
            },
            SpecialCommand::SendRecording => match recorder.stop().await {
                Ok(Some(clip)) => {
                    println!("{}", "Transcribing...".dimmed());
                    if let Some(text) = controller.transcribe(&clip).await {
                        println!("{} {}", "You (voice):".cyan().bold(), text);
                        render::print_notifications(controller.drain_notifications());
                        send_and_print(controller, &text).await;
                    }
                }
                Ok(None) => eprintln!("Not recording. Use /record first.\n"),
                Err(e) => eprintln!("{}\n", e),
            },
            SpecialCommand::CancelRecording => {
                if recorder.is_recording() {
                    recorder.cancel().await;
                    println!("Recording discarded\n");
                } else {
                    eprintln!("Not recording.\n");
                }
            }
            SpecialCommand::ShowStatus => {
                let stored = store.entries().unwrap_or_else(|e| {
                    tracing::warn!("Failed to read local storage: {}", e);
                    Vec::new()
                });
                let status = render::StatusSnapshot {
                    session: controller.current_session(),
                    session_count: controller.sessions().len(),
                    autoplay: controller.autoplay(),
                    transport: transport_name(controller.transport()),
                    recording_secs: recorder.elapsed().map(|d| d.as_secs()),
                    level: recorder.level(),
                    diverged: controller.mutation_log().diverged_sessions(),
                    stored,
                };
                render::print_status_display(&status);
                if let Some(session) = controller.current_session() {
                    let mut playing = Vec::new();
                    for index in 0..session.messages.len() {
                        let state = controller.tts_state(&session.id, index).await;
                        if state != crate::audio::TtsState::Idle {
                            playing.push(format!("[{}] {}", index + 1, render::tts_label(state)));
                        }
                    }
                    if !playing.is_empty() {
                        println!("Audio:             {}\n", playing.join(", "));
                    }
                }
            }
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
    }

}

// Session listing handler
pub mod sessions {
    use super::*;
    use crate::session::FetchOutcome;

    /// Print the signed-in user's chats, most recent first
    ///
    /// Falls back to the locally saved copy when the backend cannot be
    /// reached.
    pub async fn list_sessions(config: &Config, json: bool) -> Result<()> {
        let auth = build_auth(config)?;
        let user = require_user(&auth).await?;
        let store = open_store(config)?;
        let mut controller = build_controller(config, &user, &store)?;

        let outcome = controller.fetch_sessions(&user.id).await;
        render::print_notifications(controller.drain_notifications());
        if outcome == FetchOutcome::Failed {
            anyhow::bail!("Could not load your chats.");
        }

        let ordered = controller.store().ordered_by_recency();
        if json {
            println!("{}", serde_json::to_string_pretty(&ordered)?);
        } else if ordered.is_empty() {
            println!("No chats yet.");
        } else {
            render::session_table(&ordered, None).printstd();
        }
        Ok(())
    }
}

// Authentication handlers
pub mod auth {
    use super::*;
    use colored::Colorize;

    /// Sign in with Google
    ///
    /// Without a secret this prints the sign-in URL; with one it stores and
    /// verifies the session.
    pub async fn login(config: &Config, session_secret: Option<String>) -> Result<()> {
        let auth = build_auth(config)?;

        if let Some(secret) = session_secret {
            let user = auth.complete_login(&secret).await?;
            println!("Signed in as {} <{}>", user.name.green(), user.email);
            return Ok(());
        }

        if auth.check_session().await {
            println!("Already signed in. Run `odialingua logout` to switch accounts.");
            return Ok(());
        }

        let redirect = auth.login_with_google().await?;
        println!("Open this URL in your browser to sign in with Google:\n");
        println!("  {}\n", redirect.url.as_str().cyan());
        println!("Then run: odialingua login --session-secret <secret>");
        Ok(())
    }

    /// Sign out and forget the locally saved chats
    pub async fn logout(config: &Config) -> Result<()> {
        let auth = build_auth(config)?;
        auth.logout_user().await?;

        match open_store(config) {
            Ok(store) => {
                if let Err(e) = SessionCache::new(store).clear() {
                    tracing::warn!("Failed to clear saved chats: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to open local storage: {}", e),
        }
        println!("Signed out.");
        Ok(())
    }

    /// Show the signed-in user
    pub async fn whoami(config: &Config) -> Result<()> {
        let auth = build_auth(config)?;
        match AuthGate::check(&auth).await {
            GateDecision::Allow(user) => {
                println!("{}", user.name.green());
                if !user.email.is_empty() {
                    println!("{}", user.email);
                }
                println!("id: {}", user.id);
            }
            GateDecision::RedirectToLogin => println!("Not signed in."),
        }
        Ok(())
    }
}

// One-shot speech and diagnostics handlers
pub mod speech {
    use super::*;
    use crate::audio::AudioBlob;
    use anyhow::Context;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    /// Synthesize `text`, writing it to `output` or playing it
    ///
    /// Playback stops on Ctrl-C.
    pub async fn speak(config: &Config, text: &str, output: Option<&Path>) -> Result<()> {
        if text.trim().is_empty() {
            return Err(OdiaLinguaError::Tts("Empty text provided".to_string()).into());
        }
        let backend = HttpBackend::new(&config.backend)?;
        let stop = CancellationToken::new();

        let interrupt = stop.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let result: Result<()> = async {
            let clip = backend.text_to_speech(text, &stop).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(path, &clip.data)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {} bytes to {}", clip.len(), path.display());
                }
                None => {
                    let sink = CommandSink::new(config.audio.player_command.clone());
                    sink.play(clip, stop.clone()).await?;
                }
            }
            Ok(())
        }
        .await;

        watcher.abort();
        result
    }

    /// Upload an audio file and print the transcript
    pub async fn transcribe(config: &Config, file: &Path) -> Result<()> {
        let clip = AudioBlob::from_file(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        clip.validate_for_upload(config.audio.max_upload_bytes)?;

        let backend = HttpBackend::new(&config.backend)?;
        let transcription = backend.speech_to_text(&clip).await?;
        if transcription.transcript.trim().is_empty() {
            println!("No speech detected.");
        } else {
            println!("{}", transcription.transcript.trim());
        }
        if let Some(language) = transcription.detected_language {
            tracing::info!(language = %language, "Detected language");
        }
        Ok(())
    }

    /// Check that the backend answers
    pub async fn health(config: &Config) -> Result<()> {
        let backend = HttpBackend::new(&config.backend)?;
        let status = backend.health().await?;
        match status.message {
            Some(message) => println!("{}: {}", status.status, message),
            None => println!("{}", status.status),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_secret_store_prefers_env_secret() {
        let mut config = crate::test_utils::test_config();
        config.appwrite.project_id = "proj".to_string();

        std::env::set_var(SESSION_SECRET_ENV, "  env-secret ");
        let store = secret_store(&config);
        std::env::remove_var(SESSION_SECRET_ENV);

        let session = store.load("proj").unwrap().unwrap();
        assert_eq!(session.secret, "env-secret");
    }

    #[tokio::test]
    async fn test_require_user_without_session_fails() {
        let auth = AppwriteAuth::new(
            &crate::config::AppwriteConfig::default(),
            Arc::new(MemorySecretStore::new()),
        )
        .unwrap();
        crate::test_utils::assert_error_contains(require_user(&auth).await, "odialingua login");
    }
}
