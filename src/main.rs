//! OdiaLingua - terminal client for the OdiaLingua assistant
//!
#![doc = "OdiaLingua - terminal client for the OdiaLingua assistant"]
#![doc = "Main entry point for the OdiaLingua application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use odialingua::cli::{Cli, Commands};
use odialingua::commands;
use odialingua::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { session } => {
            if let Some(id) = &session {
                tracing::debug!("Opening session: {}", id);
            }
            commands::chat::run_chat(config, session).await?;
            Ok(())
        }
        Commands::Sessions { json } => {
            commands::sessions::list_sessions(&config, json).await?;
            Ok(())
        }
        Commands::Login { session_secret } => {
            tracing::info!("Starting Google sign-in");
            commands::auth::login(&config, session_secret).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(&config).await?;
            Ok(())
        }
        Commands::Whoami => {
            commands::auth::whoami(&config).await?;
            Ok(())
        }
        Commands::Speak { text, output } => {
            commands::speech::speak(&config, &text, output.as_deref()).await?;
            Ok(())
        }
        Commands::Transcribe { file } => {
            commands::speech::transcribe(&config, &file).await?;
            Ok(())
        }
        Commands::Health => {
            commands::speech::health(&config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with the transcript on stdout.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "odialingua=debug"
    } else {
        "odialingua=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
