//! Runtime state shared between the event loop and commands.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Mutable bot state that is not part of the configuration file.
#[derive(Debug)]
pub struct BotState {
    /// Whether keyword autoreplies are suppressed.
    pub autoreplies_muted: bool,

    /// Conversations seen so far, by id.
    conversations: BTreeMap<String, String>,

    /// Registered command names, published by the event loop.
    command_names: Vec<String>,

    /// When the bot started.
    started_at: DateTime<Utc>,
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            autoreplies_muted: false,
            conversations: BTreeMap::new(),
            command_names: Vec::new(),
            started_at: Utc::now(),
        }
    }
}

impl BotState {
    /// Creates a new bot state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a conversation, updating its name if it changed.
    pub fn record_conversation(&mut self, id: &str, name: &str) {
        if self.conversations.get(id).map(String::as_str) != Some(name) {
            self.conversations.insert(id.to_owned(), name.to_owned());
        }
    }

    /// Forgets a conversation (after leaving it).
    pub fn forget_conversation(&mut self, id: &str) {
        self.conversations.remove(id);
    }

    /// Conversations seen so far as `(id, name)` pairs, ordered by id.
    pub fn conversations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.conversations
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    /// Ids of the conversations whose name contains `filter` (case-insensitive).
    #[must_use]
    pub fn find_conversations(&self, filter: &str) -> Vec<String> {
        let filter = filter.trim().to_lowercase();
        self.conversations
            .iter()
            .filter(|(_, name)| name.to_lowercase().contains(&filter))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Replaces the published command listing.
    pub fn set_command_names(&mut self, names: Vec<String>) {
        self.command_names = names;
    }

    /// Registered command names, sorted.
    #[must_use]
    pub fn command_names(&self) -> &[String] {
        &self.command_names
    }

    /// When the bot started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
