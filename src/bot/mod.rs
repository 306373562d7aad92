//! Bot runtime: routing context, shared state and the event loop.

mod context;
mod runner;
mod state;

pub use context::BotContext;
pub use runner::{BotMessage, BotRunner};
pub use state::BotState;

use crate::chat::ChatEvent;
use crate::commands::{Dispatcher, SharedHandler};

/// Dispatcher specialised to the bot's context and event types.
pub type BotDispatcher = Dispatcher<BotContext, ChatEvent>;

/// Handler specialised to the bot's context and event types.
pub type BotHandler = SharedHandler<BotContext, ChatEvent>;
