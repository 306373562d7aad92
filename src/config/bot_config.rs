//! Bot configuration file and validation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::FallbackArgs;

/// Errors that can occur while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Admin entry at index {index} is empty")]
    EmptyAdmin { index: usize },

    #[error("Disabled command entry at index {index} is empty")]
    EmptyDisabledCommand { index: usize },

    #[error("Autoreply at index {index} has no keywords")]
    NoKeywords { index: usize },

    #[error("Autoreply at index {index} has an invalid keyword '{keyword}' (must be a single non-empty word)")]
    InvalidKeyword { index: usize, keyword: String },

    #[error("Autoreply at index {index} has an empty reply")]
    EmptyReply { index: usize },

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Per-conversation switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationOptions {
    /// Whether command messages are dispatched.
    #[serde(default = "default_true")]
    pub commands_enabled: bool,

    /// Whether messages are forwarded to other conversations.
    #[serde(default)]
    pub forwarding_enabled: bool,

    /// Whether keyword autoreplies are sent.
    #[serde(default = "default_true")]
    pub autoreplies_enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            commands_enabled: true,
            forwarding_enabled: false,
            autoreplies_enabled: true,
        }
    }
}

/// A canned reply triggered by keywords in ordinary messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Autoreply {
    /// Words that trigger the reply (case-insensitive, whole word).
    pub keywords: Vec<String>,

    /// Text sent back.
    pub reply: String,
}

impl Autoreply {
    /// Creates a new autoreply.
    #[must_use]
    pub fn new(keywords: &[&str], reply: impl Into<String>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            reply: reply.into(),
        }
    }

    /// Checks whether any keyword appears as a word in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        text.split_whitespace()
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .any(|word| self.keywords.iter().any(|k| k.to_lowercase() == word))
    }
}

/// Bot configuration loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// User ids allowed to run privileged commands such as `quit`.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Tokens handed to the unknown-command handler.
    #[serde(default)]
    pub fallback_args: FallbackArgs,

    /// Built-in commands that are not registered.
    #[serde(default)]
    pub disabled_commands: Vec<String>,

    /// Options for conversations without an explicit entry.
    #[serde(default)]
    pub default_conversation: ConversationOptions,

    /// Options by conversation id.
    #[serde(default)]
    pub conversations: BTreeMap<String, ConversationOptions>,

    /// Keyword autoreplies, checked in order.
    #[serde(default)]
    pub autoreplies: Vec<Autoreply>,
}

impl BotConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(e) = self.top_level_errors().into_iter().next() {
            return Err(e);
        }

        for (index, autoreply) in self.autoreplies.iter().enumerate() {
            validate_autoreply(index, autoreply)?;
        }

        Ok(())
    }

    /// Returns every problem with the admin and disabled-command lists.
    #[must_use]
    pub fn top_level_errors(&self) -> Vec<ConfigError> {
        let admins = self
            .admins
            .iter()
            .enumerate()
            .filter(|(_, a)| a.trim().is_empty())
            .map(|(index, _)| ConfigError::EmptyAdmin { index });

        let disabled = self
            .disabled_commands
            .iter()
            .enumerate()
            .filter(|(_, c)| c.trim().is_empty())
            .map(|(index, _)| ConfigError::EmptyDisabledCommand { index });

        admins.chain(disabled).collect()
    }

    /// Returns validation results for every autoreply entry.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<(), ConfigError>> {
        self.autoreplies
            .iter()
            .enumerate()
            .map(|(index, autoreply)| validate_autoreply(index, autoreply))
            .collect()
    }

    /// Returns the options for a conversation.
    #[must_use]
    pub fn conversation(&self, conversation_id: &str) -> ConversationOptions {
        self.conversations
            .get(conversation_id)
            .copied()
            .unwrap_or(self.default_conversation)
    }

    /// Checks whether a user may run privileged commands.
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }

    /// Checks whether a built-in command is disabled.
    #[must_use]
    pub fn is_disabled(&self, command: &str) -> bool {
        self.disabled_commands.iter().any(|c| c == command)
    }

    /// Returns the first autoreply triggered by `text`.
    #[must_use]
    pub fn find_autoreply(&self, text: &str) -> Option<&Autoreply> {
        self.autoreplies.iter().find(|a| a.matches(text))
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        let mut conversations = BTreeMap::new();
        conversations.insert(
            "console".to_owned(),
            ConversationOptions {
                commands_enabled: true,
                forwarding_enabled: false,
                autoreplies_enabled: true,
            },
        );

        Self {
            admins: vec!["console-user".to_owned()],
            fallback_args: FallbackArgs::FullTokens,
            disabled_commands: vec![],
            default_conversation: ConversationOptions::default(),
            conversations,
            autoreplies: vec![
                Autoreply::new(&["hello", "hi", "hey"], "Hello there!"),
                Autoreply::new(&["thanks"], "You're welcome."),
            ],
        }
    }
}

fn validate_autoreply(index: usize, autoreply: &Autoreply) -> Result<(), ConfigError> {
    if autoreply.keywords.is_empty() {
        return Err(ConfigError::NoKeywords { index });
    }

    if let Some(keyword) = autoreply
        .keywords
        .iter()
        .find(|k| k.is_empty() || k.chars().any(char::is_whitespace))
    {
        return Err(ConfigError::InvalidKeyword {
            index,
            keyword: keyword.clone(),
        });
    }

    if autoreply.reply.trim().is_empty() {
        return Err(ConfigError::EmptyReply { index });
    }

    Ok(())
}
