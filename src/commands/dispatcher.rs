//! Command registry and dispatch.
//!
//! The `Dispatcher` maps command names to handlers, falls back to an optional
//! handler for unknown names, and runs the chosen handler so that its failure
//! never reaches the caller's event loop.
//!
//! A handler panic is still seen by the process panic hook before it is
//! caught. Hooks can call [`running_command`] to tell such panics apart, since
//! the dispatcher logs them itself.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use tracing::{Instrument, debug, debug_span, error, warn};

use super::types::{
    DEFAULT_COMMAND_MARKER, DispatchError, FallbackArgs, SharedHandler, strip_marker,
};

tokio::task_local! {
    static RUNNING_COMMAND: String;
}

/// Name of the command whose handler is running on the current task.
#[must_use]
pub fn running_command() -> Option<String> {
    RUNNING_COMMAND.try_with(Clone::clone).ok()
}

/// Counters updated by every dispatch.
#[derive(Debug, Default)]
pub struct DispatchStats {
    invoked: AtomicU64,
    fallback: AtomicU64,
    failed: AtomicU64,
    unresolved: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Handler invocations, fallback included.
    pub invoked: u64,
    /// Invocations that went to the fallback handler.
    pub fallback: u64,
    /// Invocations that returned an error or panicked.
    pub failed: u64,
    /// Commands with no handler and no fallback.
    pub unresolved: u64,
}

impl DispatchStats {
    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            invoked: self.invoked.load(Ordering::Relaxed),
            fallback: self.fallback.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
        }
    }
}

/// Name-keyed command registry with an optional fallback.
pub struct Dispatcher<C, E> {
    /// Marker character stripped from the command token.
    marker: char,

    /// Registered handlers by name.
    commands: HashMap<String, SharedHandler<C, E>>,

    /// Handler for names with no registration.
    fallback: Option<SharedHandler<C, E>>,

    /// Tokens handed to the fallback.
    fallback_args: FallbackArgs,

    stats: Arc<DispatchStats>,
}

impl<C, E> Dispatcher<C, E> {
    /// Creates an empty dispatcher using the default `/` marker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_COMMAND_MARKER)
    }

    /// Creates an empty dispatcher that strips `marker` from command tokens.
    #[must_use]
    pub fn with_marker(marker: char) -> Self {
        Self {
            marker,
            commands: HashMap::new(),
            fallback: None,
            fallback_args: FallbackArgs::default(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Sets which tokens the fallback handler receives.
    pub fn set_fallback_args(&mut self, fallback_args: FallbackArgs) {
        self.fallback_args = fallback_args;
    }

    /// Returns the marker character stripped from command tokens.
    #[must_use]
    pub const fn marker(&self) -> char {
        self.marker
    }

    /// Binds `handler` under its name and returns it unchanged.
    ///
    /// A second registration under the same name replaces the first.
    pub fn register(&mut self, handler: SharedHandler<C, E>) -> SharedHandler<C, E> {
        let name = handler.name().to_owned();
        if self
            .commands
            .insert(name.clone(), Arc::clone(&handler))
            .is_some()
        {
            warn!(command = %name, "Command registered twice, replacing previous handler");
        } else {
            debug!(command = %name, "Registered command");
        }
        handler
    }

    /// Sets the handler used for unknown commands, replacing any previous one.
    pub fn register_fallback(&mut self, handler: SharedHandler<C, E>) -> SharedHandler<C, E> {
        debug!(handler = %handler.name(), "Registered fallback handler");
        self.fallback = Some(Arc::clone(&handler));
        handler
    }

    /// Removes every registration and the fallback.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.fallback = None;
    }

    /// Checks whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Returns the registered command names, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Checks if no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Checks if a fallback handler is registered.
    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Returns a snapshot of the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Picks the handler and arguments for `tokens` without running anything.
    ///
    /// The first token is the command token; the rest are the arguments.
    pub fn resolve(&self, tokens: &[String]) -> Result<ResolvedCommand<C, E>, DispatchError> {
        let (raw, args) = match tokens.split_first() {
            Some((raw, args)) => (raw.as_str(), args),
            None => ("", tokens),
        };
        let command = strip_marker(raw, self.marker).to_owned();

        if let Some(handler) = self.commands.get(&command) {
            return Ok(ResolvedCommand {
                command,
                handler: Arc::clone(handler),
                args: args.to_vec(),
                via_fallback: false,
                stats: Arc::clone(&self.stats),
            });
        }

        let Some(fallback) = &self.fallback else {
            self.stats.unresolved.fetch_add(1, Ordering::Relaxed);
            return Err(DispatchError::UnresolvedCommand { command });
        };

        let args = match self.fallback_args {
            FallbackArgs::FullTokens => tokens.to_vec(),
            FallbackArgs::Remaining => args.to_vec(),
        };

        Ok(ResolvedCommand {
            command,
            handler: Arc::clone(fallback),
            args,
            via_fallback: true,
            stats: Arc::clone(&self.stats),
        })
    }

    /// Resolves `tokens` and runs the selected handler.
    ///
    /// Only an unresolved command is reported as an error; handler failures
    /// are logged and absorbed here.
    pub async fn dispatch(
        &self,
        ctx: &C,
        event: &E,
        tokens: &[String],
    ) -> Result<(), DispatchError> {
        let resolved = self.resolve(tokens)?;
        resolved.run(ctx, event).await;
        Ok(())
    }
}

impl<C, E> Default for Dispatcher<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> fmt::Debug for Dispatcher<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("Dispatcher")
            .field("marker", &self.marker)
            .field("commands", &names)
            .field("has_fallback", &self.fallback.is_some())
            .field("fallback_args", &self.fallback_args)
            .finish_non_exhaustive()
    }
}

/// A handler chosen for one command, ready to run.
///
/// Owns everything it needs, so the registry can be released before the
/// handler starts.
pub struct ResolvedCommand<C, E> {
    command: String,
    handler: SharedHandler<C, E>,
    args: Vec<String>,
    via_fallback: bool,
    stats: Arc<DispatchStats>,
}

impl<C, E> ResolvedCommand<C, E> {
    /// Command name after marker stripping.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Name of the handler that will run.
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    /// Arguments the handler will receive.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether the fallback handler was selected.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.via_fallback
    }

    /// Runs the handler once, logging and absorbing any failure.
    pub async fn run(self, ctx: &C, event: &E) {
        self.stats.invoked.fetch_add(1, Ordering::Relaxed);
        if self.via_fallback {
            self.stats.fallback.fetch_add(1, Ordering::Relaxed);
        }

        let span = debug_span!(
            "command",
            command = %self.command,
            handler = %self.handler.name(),
            fallback = self.via_fallback,
        );

        let guarded =
            AssertUnwindSafe(self.handler.handle(ctx, event, &self.args)).catch_unwind();
        let outcome = RUNNING_COMMAND
            .scope(self.command.clone(), guarded)
            .instrument(span)
            .await;

        match outcome {
            Ok(Ok(())) => {
                debug!(command = %self.command, "Command completed");
            }
            Ok(Err(e)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(command = %self.command, error = %e, "Command failed");
            }
            Err(payload) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    command = %self.command,
                    panic = %panic_message(payload.as_ref()),
                    "Command panicked"
                );
            }
        }
    }
}

impl<C, E> fmt::Debug for ResolvedCommand<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCommand")
            .field("command", &self.command)
            .field("handler", &self.handler.name())
            .field("args", &self.args)
            .field("via_fallback", &self.via_fallback)
            .finish_non_exhaustive()
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::types::{Handler, HandlerError, HandlerResult, wants_usage};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Replies(Mutex<Vec<String>>);

    impl Replies {
        async fn push(&self, text: impl Into<String>) {
            self.0.lock().await.push(text.into());
        }

        async fn all(&self) -> Vec<String> {
            self.0.lock().await.clone()
        }
    }

    struct Event;

    struct Reply {
        name: &'static str,
        text: &'static str,
    }

    #[async_trait]
    impl Handler<Replies, Event> for Reply {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, ctx: &Replies, _event: &Event, args: &[String]) -> HandlerResult {
            if wants_usage(args) {
                ctx.push(format!("Usage: /{}", self.name)).await;
            } else {
                ctx.push(self.text).await;
            }
            Ok(())
        }
    }

    struct Echo;

    #[async_trait]
    impl Handler<Replies, Event> for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, ctx: &Replies, _event: &Event, args: &[String]) -> HandlerResult {
            ctx.push(args.join(" ")).await;
            Ok(())
        }
    }

    /// Records the arguments of every call.
    struct Record {
        name: &'static str,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl Record {
        fn new(name: &'static str) -> (Arc<Self>, Arc<Mutex<Vec<Vec<String>>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let handler = Arc::new(Self {
                name,
                calls: Arc::clone(&calls),
            });
            (handler, calls)
        }
    }

    #[async_trait]
    impl Handler<Replies, Event> for Record {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, _ctx: &Replies, _event: &Event, args: &[String]) -> HandlerResult {
            self.calls.lock().await.push(args.to_vec());
            Ok(())
        }
    }

    struct Boom;

    #[async_trait]
    impl Handler<Replies, Event> for Boom {
        fn name(&self) -> &str {
            "boom"
        }

        async fn handle(&self, ctx: &Replies, _event: &Event, _args: &[String]) -> HandlerResult {
            ctx.push("partial").await;
            Err(HandlerError::InvalidArguments("always fails".to_owned()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Handler<Replies, Event> for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn handle(&self, _ctx: &Replies, _event: &Event, _args: &[String]) -> HandlerResult {
            panic!("handler defect");
        }
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test]
    async fn test_dispatch_ping_with_marker() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Reply {
            name: "ping",
            text: "pong",
        }));
        let ctx = Replies::default();

        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["/ping"]))
            .await
            .unwrap();

        assert_eq!(ctx.all().await, vec!["pong"]);
    }

    #[tokio::test]
    async fn test_marker_stripping_resolves_identically() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        let (handler, calls) = Record::new("ping");
        dispatcher.register(handler);

        dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["/ping", "x"]))
            .await
            .unwrap();
        dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["ping", "x"]))
            .await
            .unwrap();

        let calls = calls.lock().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn test_dispatch_echo_passes_arguments_in_order() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Echo));
        let ctx = Replies::default();

        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["echo", "a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(ctx.all().await, vec!["a b c"]);
    }

    #[tokio::test]
    async fn test_dispatch_usage_request_reaches_handler() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Reply {
            name: "ping",
            text: "pong",
        }));
        let ctx = Replies::default();

        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["ping", "?"]))
            .await
            .unwrap();

        assert_eq!(ctx.all().await, vec!["Usage: /ping"]);
    }

    #[tokio::test]
    async fn test_unresolved_without_fallback() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        let (handler, calls) = Record::new("ping");
        dispatcher.register(handler);

        let result = dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["/frobnicate"]))
            .await;

        assert_eq!(
            result,
            Err(DispatchError::UnresolvedCommand {
                command: "frobnicate".to_owned()
            })
        );
        assert!(calls.lock().await.is_empty());
        assert_eq!(dispatcher.stats().invoked, 0);
        assert_eq!(dispatcher.stats().unresolved, 1);
    }

    #[tokio::test]
    async fn test_fallback_replies_unknown_command() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register_fallback(Arc::new(Reply {
            name: "unknown",
            text: "Unknown command!",
        }));
        let ctx = Replies::default();

        let result = dispatcher.dispatch(&ctx, &Event, &tokens(&["frobnicate"])).await;

        assert!(result.is_ok());
        assert_eq!(ctx.all().await, vec!["Unknown command!"]);
        assert_eq!(dispatcher.stats().fallback, 1);
    }

    #[tokio::test]
    async fn test_fallback_receives_full_tokens_by_default() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        let (fallback, calls) = Record::new("unknown");
        dispatcher.register_fallback(fallback);

        dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["/frobnicate", "x", "y"]))
            .await
            .unwrap();

        assert_eq!(calls.lock().await[0], tokens(&["/frobnicate", "x", "y"]));
    }

    #[tokio::test]
    async fn test_fallback_receives_remaining_tokens_when_configured() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.set_fallback_args(FallbackArgs::Remaining);
        let (fallback, calls) = Record::new("unknown");
        dispatcher.register_fallback(fallback);

        dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["/frobnicate", "x", "y"]))
            .await
            .unwrap();

        assert_eq!(calls.lock().await[0], tokens(&["x", "y"]));
    }

    #[tokio::test]
    async fn test_failing_handler_is_isolated() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Boom));
        let ctx = Replies::default();

        let result = dispatcher.dispatch(&ctx, &Event, &tokens(&["boom"])).await;

        assert!(result.is_ok());
        assert_eq!(ctx.all().await, vec!["partial"]);
        let stats = dispatcher.stats();
        assert_eq!(stats.invoked, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Panics));

        let result = dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["panics"]))
            .await;

        assert!(result.is_ok());
        assert_eq!(dispatcher.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        let (first, first_calls) = Record::new("ping");
        let (second, second_calls) = Record::new("ping");
        let (other, _) = Record::new("echo");
        dispatcher.register(first);
        dispatcher.register(other);
        dispatcher.register(second);

        assert_eq!(dispatcher.len(), 2);
        dispatcher
            .dispatch(&Replies::default(), &Event, &tokens(&["ping"]))
            .await
            .unwrap();

        assert!(first_calls.lock().await.is_empty());
        assert_eq!(second_calls.lock().await.len(), 1);
    }

    #[test]
    fn test_register_returns_same_handler() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        let handler: SharedHandler<Replies, Event> = Arc::new(Echo);
        let returned = dispatcher.register(Arc::clone(&handler));
        assert!(Arc::ptr_eq(&handler, &returned));
    }

    #[test]
    fn test_names_case_sensitive() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Echo));
        assert!(dispatcher.contains("echo"));
        assert!(!dispatcher.contains("ECHO"));
        assert!(dispatcher.resolve(&tokens(&["ECHO"])).is_err());
    }

    #[test]
    fn test_resolve_empty_tokens() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        assert_eq!(
            dispatcher.resolve(&[]).unwrap_err(),
            DispatchError::UnresolvedCommand {
                command: String::new()
            }
        );

        dispatcher.register_fallback(Arc::new(Echo));
        let resolved = dispatcher.resolve(&[]).unwrap();
        assert!(resolved.is_fallback());
        assert!(resolved.args().is_empty());
    }

    #[test]
    fn test_custom_marker() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::with_marker('!');
        dispatcher.register(Arc::new(Echo));
        let resolved = dispatcher.resolve(&tokens(&["!echo", "hi"])).unwrap();
        assert_eq!(resolved.command(), "echo");
        assert_eq!(resolved.handler_name(), "echo");
        assert_eq!(resolved.args(), tokens(&["hi"]).as_slice());
        assert!(dispatcher.resolve(&tokens(&["/echo"])).is_err());
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Echo));
        dispatcher.register_fallback(Arc::new(Echo));
        dispatcher.clear();
        assert!(dispatcher.is_empty());
        assert!(!dispatcher.has_fallback());
    }

    #[test]
    fn test_command_names_sorted() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Reply {
            name: "ping",
            text: "pong",
        }));
        dispatcher.register(Arc::new(Echo));
        dispatcher.register(Arc::new(Boom));
        assert_eq!(dispatcher.command_names(), vec!["boom", "echo", "ping"]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn error_lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .filter(|line| line.contains("ERROR"))
                .map(str::to_owned)
                .collect()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    struct Broken;

    #[async_trait]
    impl Handler<Replies, Event> for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn handle(&self, _ctx: &Replies, _event: &Event, _args: &[String]) -> HandlerResult {
            Err(anyhow::anyhow!("disk on fire").into())
        }
    }

    #[tokio::test]
    async fn test_each_failure_logs_one_error_line() {
        let (logs, _guard) = capture_logs();
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(Boom));
        dispatcher.register(Arc::new(Panics));
        dispatcher.register(Arc::new(Broken));
        let ctx = Replies::default();

        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["/boom"]))
            .await
            .unwrap();
        let lines = logs.error_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Command failed"));
        assert!(lines[0].contains("always fails"));

        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["/panics"]))
            .await
            .unwrap();
        let lines = logs.error_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Command panicked"));
        assert!(lines[1].contains("handler defect"));

        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["/broken"]))
            .await
            .unwrap();
        let lines = logs.error_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("disk on fire"));

        assert_eq!(dispatcher.stats().failed, 3);
    }

    struct WhoAmI;

    #[async_trait]
    impl Handler<Replies, Event> for WhoAmI {
        fn name(&self) -> &str {
            "whoami"
        }

        async fn handle(&self, ctx: &Replies, _event: &Event, _args: &[String]) -> HandlerResult {
            ctx.push(running_command().unwrap_or_default()).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_running_command_visible_only_inside_handler() {
        let mut dispatcher: Dispatcher<Replies, Event> = Dispatcher::new();
        dispatcher.register(Arc::new(WhoAmI));
        let ctx = Replies::default();

        assert_eq!(running_command(), None);
        dispatcher
            .dispatch(&ctx, &Event, &tokens(&["/whoami"]))
            .await
            .unwrap();
        assert_eq!(ctx.all().await, vec!["whoami"]);
        assert_eq!(running_command(), None);
    }
}
