//! Command types and definitions.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default marker character that may prefix a command token.
pub const DEFAULT_COMMAND_MARKER: char = '/';

/// The single argument that asks a command for its usage instead of running it.
pub const USAGE_REQUEST: &str = "?";

/// Errors raised by a handler while it runs.
///
/// These never leave [`Dispatcher::dispatch`](super::Dispatcher::dispatch);
/// they are logged and absorbed at the dispatch boundary.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed to deliver to the transport: {0}")]
    Delivery(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Errors that cross the dispatch boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown command '{command}' and no fallback handler is registered")]
    UnresolvedCommand { command: String },
}

/// A named command the dispatcher can invoke.
///
/// `C` is the routing context handed through untouched and `E` the inbound
/// event. Handlers report results only through side effects on the context.
#[async_trait]
pub trait Handler<C, E>: Send + Sync {
    /// Registry key, also shown in command listings.
    fn name(&self) -> &str;

    /// Runs the command with the arguments following the command token.
    async fn handle(&self, ctx: &C, event: &E, args: &[String]) -> HandlerResult;
}

/// Shared handle to a registered handler.
pub type SharedHandler<C, E> = Arc<dyn Handler<C, E>>;

/// Which tokens the fallback handler receives for an unknown command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackArgs {
    /// The complete token list, including the raw command token.
    #[default]
    FullTokens,

    /// Only the tokens after the command token.
    Remaining,
}

/// Strips one leading marker character from a command token.
#[must_use]
pub fn strip_marker(token: &str, marker: char) -> &str {
    token.strip_prefix(marker).unwrap_or(token)
}

/// Checks whether the arguments are a usage request (`?` alone).
#[must_use]
pub fn wants_usage(args: &[String]) -> bool {
    args.concat() == USAGE_REQUEST
}
