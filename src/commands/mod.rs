//! Command handling module.
//!
//! A name-keyed registry of handlers with an optional fallback, and the
//! dispatch protocol that runs one handler per command message while
//! keeping its failures away from the event loop.

pub mod builtin;
mod dispatcher;
mod types;

pub use dispatcher::{
    DispatchStats, Dispatcher, ResolvedCommand, StatsSnapshot, running_command,
};
pub use types::{
    DEFAULT_COMMAND_MARKER, DispatchError, FallbackArgs, Handler, HandlerError, HandlerResult,
    SharedHandler, USAGE_REQUEST, strip_marker, wants_usage,
};
