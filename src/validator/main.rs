//! Standalone validator for bot configuration files.
//!
//! Checks the JSON configuration for structural errors and flags settings
//! that are legal but probably unintended.

use std::process::ExitCode;

use clap::Parser;

// Import from the main crate
use chat_command_bot::bot::BotDispatcher;
use chat_command_bot::commands::builtin;
use chat_command_bot::config::BotConfig;

/// Bot configuration validator.
#[derive(Parser, Debug)]
#[command(name = "validate_config")]
#[command(about = "Validates configuration files for the chat command bot")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file to validate.
    #[arg(short, long, default_value = "bot.json")]
    file: String,

    /// Generate an example configuration file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show detailed information for each autoreply.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Handle example generation
    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_config(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = BotConfig::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example configuration written to: {output_path}");
            println!(
                "\nThe file contains {} example autoreplies.",
                example.autoreplies.len()
            );
            println!("Edit 'admins' to list the user ids allowed to stop the bot.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_config(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let config = match BotConfig::load_from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let Tally { errors, warnings } = check(&config, verbose);

    println!();

    if errors == 0 {
        println!("✓ Configuration is valid!");
        if warnings > 0 {
            println!("  ({warnings} warning(s))");
        }

        println!("\nSummary:");
        println!("  Admins:            {}", config.admins.len());
        println!("  Autoreplies:       {}", config.autoreplies.len());
        println!("  Conversations:     {}", config.conversations.len());
        println!("  Disabled commands: {}", config.disabled_commands.len());

        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {errors} error(s)");
        ExitCode::FAILURE
    }
}

/// Error and warning counts from one validation run.
#[derive(Debug, Default)]
struct Tally {
    errors: usize,
    warnings: usize,
}

/// Prints every problem in `config` and counts them.
fn check(config: &BotConfig, verbose: bool) -> Tally {
    let mut tally = Tally::default();

    for e in config.top_level_errors() {
        tally.errors += 1;
        println!("✗ Error: {e}");
    }

    for (i, result) in config.validate_all().iter().enumerate() {
        let autoreply = &config.autoreplies[i];

        if verbose {
            println!(
                "[{i}] {} -> \"{}\"",
                autoreply.keywords.join(", "),
                truncate(&autoreply.reply, 40)
            );
        }

        match result {
            Ok(()) => {
                if verbose {
                    println!("  ✓ OK");
                }
            }
            Err(e) => {
                tally.errors += 1;
                println!("  ✗ Error: {e}");
            }
        }
    }

    let known = builtin_command_names();
    for name in &config.disabled_commands {
        if !name.trim().is_empty() && !known.contains(name) {
            tally.warnings += 1;
            println!("⚠ Warning: disabled command '{name}' is not a built-in command");
        }
    }

    if config.admins.is_empty() {
        tally.warnings += 1;
        println!("⚠ Warning: no admins configured, nobody can stop the bot with 'quit'");
    }

    tally
}

/// Names of all built-in commands.
fn builtin_command_names() -> Vec<String> {
    let mut dispatcher = BotDispatcher::new();
    builtin::install(&mut dispatcher, &BotConfig::default());
    dispatcher.command_names()
}

/// Truncates a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
