//! Bot event loop.
//!
//! The loop selects over two channels:
//! 1. Inbound chat events. Command messages are resolved against the
//!    dispatcher and each resolved command runs in its own task; other
//!    messages may trigger a keyword autoreply.
//! 2. Control messages from commands: reload the configuration (rebuilding
//!    the registry between dispatches) or shut down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BotContext, BotDispatcher};
use crate::chat::{ChatEvent, command_tokens};
use crate::commands::builtin;
use crate::config::{BotConfig, ConfigError};

/// Messages that can be sent to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotMessage {
    /// Reload the configuration file and reply in the given conversation.
    Reload { conversation_id: String },
    /// Stop the event loop.
    Shutdown,
}

/// Owns the dispatcher and feeds it chat events.
pub struct BotRunner {
    /// Command registry, written only by reload.
    dispatcher: Arc<RwLock<BotDispatcher>>,

    /// Routing context cloned into every command task.
    context: BotContext,

    /// Configuration file re-read on reload.
    config_path: PathBuf,
}

impl BotRunner {
    /// Creates a new event loop.
    #[must_use]
    pub fn new(
        dispatcher: BotDispatcher,
        context: BotContext,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dispatcher: Arc::new(RwLock::new(dispatcher)),
            context,
            config_path: config_path.into(),
        }
    }

    /// The shared dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<RwLock<BotDispatcher>> {
        &self.dispatcher
    }

    /// The routing context.
    #[must_use]
    pub const fn context(&self) -> &BotContext {
        &self.context
    }

    /// Runs until a shutdown request or until the event channel closes.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<ChatEvent>,
        mut control: mpsc::Receiver<BotMessage>,
    ) {
        self.publish_commands().await;
        info!("Bot event loop started");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            self.handle_event(event).await;
                        }
                        None => {
                            info!("Event channel closed");
                            break;
                        }
                    }
                }
                msg = control.recv() => {
                    match msg {
                        Some(BotMessage::Reload { conversation_id }) => {
                            debug!("Received reload message");
                            self.reload(&conversation_id).await;
                        }
                        Some(BotMessage::Shutdown) | None => {
                            info!("Bot event loop shutting down");
                            break;
                        }
                    }
                }
            }
        }

        let started_at = self.context.state().read().await.started_at();
        let uptime = chrono::Utc::now().signed_duration_since(started_at);
        info!(uptime_secs = uptime.num_seconds(), "Bot event loop stopped");
    }

    /// Handles one inbound event.
    ///
    /// Returns the task running the command, if one was started.
    pub async fn handle_event(&self, event: ChatEvent) -> Option<JoinHandle<()>> {
        self.context
            .state()
            .write()
            .await
            .record_conversation(&event.conversation.id, &event.conversation.name);

        let options = self
            .context
            .config()
            .read()
            .await
            .conversation(event.conversation_id());

        let Some(tokens) = command_tokens(&event.text, self.context.marker()) else {
            if options.autoreplies_enabled {
                self.autoreply(&event).await;
            }
            return None;
        };

        if !options.commands_enabled {
            debug!(
                conversation = %event.conversation.id,
                "Commands disabled in conversation, ignoring"
            );
            return None;
        }

        let resolved = self.dispatcher.read().await.resolve(&tokens);
        match resolved {
            Ok(command) => {
                info!(
                    user = %event.user.full_name,
                    conversation = %event.conversation.id,
                    command = %command.command(),
                    "Dispatching command"
                );
                let context = self.context.clone();
                Some(tokio::spawn(async move {
                    command.run(&context, &event).await;
                }))
            }
            Err(e) => {
                warn!(user = %event.user.full_name, "{}", e);
                None
            }
        }
    }

    /// Re-reads the configuration file and rebuilds the registry.
    ///
    /// On failure the current configuration stays in place. The outcome is
    /// reported in `conversation_id`.
    pub async fn reload(&self, conversation_id: &str) {
        let reply = match load_config(&self.config_path) {
            Ok(config) => {
                {
                    let mut dispatcher = self.dispatcher.write().await;
                    dispatcher.clear();
                    builtin::install(&mut dispatcher, &config);
                }
                *self.context.config().write().await = config;
                self.publish_commands().await;
                info!("Configuration reloaded from {}", self.config_path.display());
                "Configuration reloaded.".to_owned()
            }
            Err(e) => {
                warn!("Failed to reload configuration: {}", e);
                format!("Failed to reload configuration: {e}")
            }
        };

        if let Err(e) = self.context.send_message(conversation_id, reply).await {
            warn!("Could not report reload result: {}", e);
        }
    }

    /// Publishes the registered command names for `help`.
    async fn publish_commands(&self) {
        let names = self.dispatcher.read().await.command_names();
        self.context.state().write().await.set_command_names(names);
    }

    async fn autoreply(&self, event: &ChatEvent) {
        if self.context.state().read().await.autoreplies_muted {
            return;
        }

        let reply = self
            .context
            .config()
            .read()
            .await
            .find_autoreply(&event.text)
            .map(|a| a.reply.clone());

        if let Some(reply) = reply
            && let Err(e) = self.context.reply(event, reply).await
        {
            warn!("Failed to send autoreply: {}", e);
        }
    }
}

impl std::fmt::Debug for BotRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRunner")
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

fn load_config(path: &Path) -> Result<BotConfig, ConfigError> {
    let config = BotConfig::load_from_file(path)?;
    config.validate()?;
    Ok(config)
}
