//! Configuration module for the chat bot.
//!
//! Handles loading and validation of the bot configuration file and of the
//! process settings taken from the environment.

mod bot_config;
mod settings;

pub use bot_config::{Autoreply, BotConfig, ConfigError, ConversationOptions};
pub use settings::{BotSettings, SettingsError};
