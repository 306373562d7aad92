//! Actions sent from the bot to the transport.

use std::fmt;

/// An action the transport should carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Post a text message.
    Message {
        conversation_id: String,
        text: String,
    },

    /// Change the conversation title.
    Rename {
        conversation_id: String,
        title: String,
    },

    /// Leave the conversation.
    Leave { conversation_id: String },
}

impl Outbound {
    /// Conversation the action targets.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::Message {
                conversation_id, ..
            }
            | Self::Rename {
                conversation_id, ..
            }
            | Self::Leave { conversation_id } => conversation_id,
        }
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message {
                conversation_id,
                text,
            } => write!(f, "[{conversation_id}] {text}"),
            Self::Rename {
                conversation_id,
                title,
            } => write!(f, "[{conversation_id}] * conversation renamed to \"{title}\""),
            Self::Leave { conversation_id } => write!(f, "[{conversation_id}] * bot left"),
        }
    }
}
