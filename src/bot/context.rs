//! Routing context handed to every command.

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use super::{BotMessage, BotState};
use crate::chat::{ChatEvent, Outbound};
use crate::commands::{HandlerError, HandlerResult};
use crate::config::BotConfig;

/// Everything a command needs to act: outbound delivery, control requests
/// to the event loop, configuration and shared state.
#[derive(Debug, Clone)]
pub struct BotContext {
    /// Command marker, used in usage texts.
    marker: char,

    /// Actions for the transport.
    outbound: mpsc::Sender<Outbound>,

    /// Requests for the event loop.
    control: mpsc::Sender<BotMessage>,

    /// Current configuration.
    config: Arc<RwLock<BotConfig>>,

    /// Shared runtime state.
    state: Arc<RwLock<BotState>>,
}

impl BotContext {
    /// Creates a new context.
    #[must_use]
    pub const fn new(
        marker: char,
        outbound: mpsc::Sender<Outbound>,
        control: mpsc::Sender<BotMessage>,
        config: Arc<RwLock<BotConfig>>,
        state: Arc<RwLock<BotState>>,
    ) -> Self {
        Self {
            marker,
            outbound,
            control,
            config,
            state,
        }
    }

    /// Command marker character.
    #[must_use]
    pub const fn marker(&self) -> char {
        self.marker
    }

    /// Shared configuration.
    #[must_use]
    pub const fn config(&self) -> &Arc<RwLock<BotConfig>> {
        &self.config
    }

    /// Shared runtime state.
    #[must_use]
    pub const fn state(&self) -> &Arc<RwLock<BotState>> {
        &self.state
    }

    /// Posts a message to a conversation.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: impl Into<String>,
    ) -> HandlerResult {
        self.deliver(Outbound::Message {
            conversation_id: conversation_id.to_owned(),
            text: text.into(),
        })
        .await
    }

    /// Posts a message to the conversation `event` came from.
    pub async fn reply(&self, event: &ChatEvent, text: impl Into<String>) -> HandlerResult {
        self.send_message(event.conversation_id(), text).await
    }

    /// Asks the transport to rename a conversation.
    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: impl Into<String>,
    ) -> HandlerResult {
        self.deliver(Outbound::Rename {
            conversation_id: conversation_id.to_owned(),
            title: title.into(),
        })
        .await
    }

    /// Asks the transport to leave a conversation.
    pub async fn leave_conversation(&self, conversation_id: &str) -> HandlerResult {
        self.deliver(Outbound::Leave {
            conversation_id: conversation_id.to_owned(),
        })
        .await?;
        self.state
            .write()
            .await
            .forget_conversation(conversation_id);
        Ok(())
    }

    /// Sends a request to the event loop.
    pub async fn request(&self, message: BotMessage) -> HandlerResult {
        self.control
            .send(message)
            .await
            .map_err(|e| HandlerError::Delivery(format!("event loop is gone: {e}")))
    }

    async fn deliver(&self, action: Outbound) -> HandlerResult {
        self.outbound
            .send(action)
            .await
            .map_err(|e| HandlerError::Delivery(format!("transport is gone: {e}")))
    }
}
