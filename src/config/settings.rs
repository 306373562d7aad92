//! Process settings read from the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::commands::DEFAULT_COMMAND_MARKER;

/// Bot-wide settings that do not live in the JSON configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the bot configuration JSON file.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Character that marks a message as a command.
    #[serde(default = "default_command_marker")]
    pub command_marker: char,

    /// Display name of the local user on the console transport.
    #[serde(default = "default_console_user")]
    pub console_user: String,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("bot.json")
}

const fn default_command_marker() -> char {
    DEFAULT_COMMAND_MARKER
}

fn default_console_user() -> String {
    "Console User".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            command_marker: default_command_marker(),
            console_user: default_console_user(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates settings from environment variables.
    ///
    /// Reads `BOT_CONFIG_PATH`, `COMMAND_MARKER`, `CONSOLE_USER` and `RUST_LOG`.
    ///
    /// # Errors
    ///
    /// Returns an error if `COMMAND_MARKER` is set but is not exactly one
    /// non-whitespace character.
    pub fn from_env() -> Result<Self, SettingsError> {
        let command_marker = match std::env::var("COMMAND_MARKER") {
            Ok(value) => parse_marker(&value)?,
            Err(_) => default_command_marker(),
        };

        Ok(Self {
            config_path: std::env::var("BOT_CONFIG_PATH")
                .map_or_else(|_| default_config_path(), PathBuf::from),
            command_marker,
            console_user: std::env::var("CONSOLE_USER")
                .unwrap_or_else(|_| default_console_user()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
        })
    }
}

/// Parses a command marker: exactly one visible character.
fn parse_marker(value: &str) -> Result<char, SettingsError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() => Ok(c),
        _ => Err(SettingsError::InvalidMarker(value.to_owned())),
    }
}

/// Settings errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid COMMAND_MARKER '{0}' (must be a single non-whitespace character)")]
    InvalidMarker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.command_marker, '/');
        assert_eq!(settings.config_path, PathBuf::from("bot.json"));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_parse_marker() {
        assert_eq!(parse_marker("!").unwrap(), '!');
        assert_eq!(parse_marker("/").unwrap(), '/');
        assert!(parse_marker("").is_err());
        assert!(parse_marker("!!").is_err());
        assert!(parse_marker(" ").is_err());
    }
}
