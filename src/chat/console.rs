//! Line-oriented console transport.
//!
//! Every input line becomes a message from a single local user in a single
//! `console` conversation; outbound actions are written one per line.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use super::{ChatEvent, Conversation, Outbound, User};

/// Id of the console conversation.
pub const CONSOLE_CONVERSATION_ID: &str = "console";

/// Id of the local console user.
pub const CONSOLE_USER_ID: &str = "console-user";

/// Console stand-in for a chat transport.
#[derive(Debug, Clone)]
pub struct ConsoleTransport {
    user: User,
    conversation: Arc<RwLock<Conversation>>,
    joined: Arc<AtomicBool>,
}

impl ConsoleTransport {
    /// Creates a transport whose messages come from `user_name`.
    #[must_use]
    pub fn new(user_name: &str) -> Self {
        let user = User::new(CONSOLE_USER_ID, user_name);
        let conversation =
            Conversation::new(CONSOLE_CONVERSATION_ID, "Console", vec![user.clone()]);
        Self {
            user,
            conversation: Arc::new(RwLock::new(conversation)),
            joined: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The local user.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Whether the bot is still in the console conversation.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::Relaxed)
    }

    /// Reads lines from `reader` and forwards them as events until EOF or
    /// until the receiving side goes away.
    pub async fn read_input<R>(
        &self,
        reader: R,
        events: mpsc::Sender<ChatEvent>,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if !self.is_joined() {
                debug!("Bot has left the console conversation, dropping input");
                continue;
            }

            let conversation = self.conversation.read().await.clone();
            let event = ChatEvent::new(self.user.clone(), conversation, line);
            if events.send(event).await.is_err() {
                debug!("Event receiver closed, stopping console input");
                break;
            }
        }

        info!("Console input closed");
        Ok(())
    }

    /// Writes outbound actions to `writer`, applying renames and leaves to
    /// the console conversation.
    pub async fn write_output<W>(
        &self,
        mut outbound: mpsc::Receiver<Outbound>,
        mut writer: W,
    ) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(action) = outbound.recv().await {
            match &action {
                Outbound::Rename { title, .. } => {
                    self.conversation.write().await.name.clone_from(title);
                }
                Outbound::Leave { .. } => {
                    self.joined.store(false, Ordering::Relaxed);
                }
                Outbound::Message { .. } => {}
            }

            writer.write_all(format!("{action}\n").as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}
