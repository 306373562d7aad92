//! Chat Command Bot - Main Entry Point
//!
//! Runs the command bot against the console transport: every input line is a
//! chat message, every bot action is printed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use chat_command_bot::bot::{BotContext, BotDispatcher, BotMessage, BotRunner, BotState};
use chat_command_bot::chat::{ChatEvent, ConsoleTransport, Outbound};
use chat_command_bot::commands::{builtin, running_command};
use chat_command_bot::config::{BotConfig, BotSettings};

/// Command-routing chat bot.
#[derive(Parser, Debug)]
#[command(name = "chat_bot")]
#[command(about = "Run the chat command bot on the console")]
#[command(version)]
struct Args {
    /// Path to the bot configuration JSON file (overrides `BOT_CONFIG_PATH`).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Display name of the console user (overrides `CONSOLE_USER`).
    #[arg(short, long)]
    user: Option<String>,

    /// Generate an example configuration file and exit.
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);
    set_panic_hook();

    // Handle example config generation
    if args.generate_config {
        return generate_example_config();
    }

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut settings =
        BotSettings::from_env().context("Failed to load bot settings from environment")?;
    if let Some(path) = args.config {
        settings.config_path = path;
    }
    if let Some(user) = args.user {
        settings.console_user = user;
    }

    let config = BotConfig::load_from_file(&settings.config_path).with_context(|| {
        format!(
            "Failed to load bot configuration from {}",
            settings.config_path.display()
        )
    })?;
    config
        .validate()
        .context("Bot configuration validation failed")?;

    info!(
        "Loaded configuration ({} admins, {} autoreplies, {} disabled commands)",
        config.admins.len(),
        config.autoreplies.len(),
        config.disabled_commands.len()
    );

    let (events_tx, events_rx) = mpsc::channel::<ChatEvent>(32);
    let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(32);
    let (control_tx, control_rx) = mpsc::channel::<BotMessage>(8);

    let mut dispatcher = BotDispatcher::with_marker(settings.command_marker);
    builtin::install(&mut dispatcher, &config);

    let context = BotContext::new(
        settings.command_marker,
        outbound_tx,
        control_tx,
        Arc::new(RwLock::new(config)),
        Arc::new(RwLock::new(BotState::new())),
    );
    let runner = BotRunner::new(dispatcher, context, settings.config_path.clone());

    let transport = ConsoleTransport::new(&settings.console_user);
    let input_task = {
        let transport = transport.clone();
        tokio::spawn(async move {
            transport
                .read_input(BufReader::new(tokio::io::stdin()), events_tx)
                .await
        })
    };
    let output_task =
        tokio::spawn(async move { transport.write_output(outbound_rx, tokio::io::stdout()).await });

    info!(
        "Bot is running. Commands start with '{}'. Use Ctrl+C to stop.",
        settings.command_marker
    );

    tokio::select! {
        () = runner.run(events_rx, control_rx) => {
            info!("Event loop finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    // Cleanup
    info!("Shutting down...");
    input_task.abort();
    drop(runner);

    // Let pending replies reach the console once the last sender is gone.
    match tokio::time::timeout(Duration::from_secs(1), output_task).await {
        Ok(Ok(Err(e))) => warn!("Console output failed: {}", e),
        Ok(Err(e)) => warn!("Console output task failed: {}", e),
        Err(_) => debug!("Console output still busy at shutdown"),
        Ok(Ok(Ok(()))) => {}
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Routes panic reports through `tracing`.
///
/// Handler panics are already logged by the dispatcher, so the hook only adds
/// their location at debug level.
fn set_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        match running_command() {
            Some(command) => debug!(%command, %location, "Handler panicked"),
            None => error!(%location, "{info}"),
        }
    }));
}

/// Generates an example configuration file.
fn generate_example_config() -> Result<()> {
    let example = BotConfig::example();
    example.save_to_file("bot.example.json")?;

    println!("✓ Example configuration written to: bot.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy bot.example.json to bot.json");
    println!("2. Add your user id to 'admins' (the console user id is 'console-user')");
    println!("3. Optionally create a .env file with COMMAND_MARKER or CONSOLE_USER");
    println!("4. Run: chat_bot");

    Ok(())
}
