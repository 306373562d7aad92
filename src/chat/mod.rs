//! Chat transport boundary.
//!
//! Defines the inbound events the bot consumes, the outbound actions it
//! produces, and a console transport for running the bot locally.

mod console;
mod event;
mod outbound;

pub use console::{CONSOLE_CONVERSATION_ID, CONSOLE_USER_ID, ConsoleTransport};
pub use event::{ChatEvent, Conversation, User, command_tokens, tokenize};
pub use outbound::Outbound;
