//! Built-in bot commands.
//!
//! Every command answers a lone `?` argument with its usage instead of
//! running. Replies go to the conversation the command came from.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::types::{Handler, HandlerError, HandlerResult, wants_usage};
use crate::bot::{BotContext, BotDispatcher, BotHandler, BotMessage};
use crate::chat::{ChatEvent, User};
use crate::config::BotConfig;

/// Self-description shown for `<command> ?`.
#[derive(Debug, Clone, Copy)]
pub struct CommandHelp {
    pub title: &'static str,
    /// Usage line without the marker.
    pub usage: &'static str,
    pub purpose: &'static str,
}

impl CommandHelp {
    /// Renders the usage block.
    #[must_use]
    pub fn render(&self, marker: char) -> String {
        format!(
            "{}\nUsage: {marker}{}\nPurpose: {}",
            self.title, self.usage, self.purpose
        )
    }
}

async fn reply_usage(ctx: &BotContext, event: &ChatEvent, help: &CommandHelp) -> HandlerResult {
    ctx.reply(event, help.render(ctx.marker())).await
}

/// Registers the built-in commands and the unknown-command fallback.
///
/// Commands listed in `disabled_commands` are skipped; aliases still reach
/// their target directly even when the target itself is disabled.
pub fn install(dispatcher: &mut BotDispatcher, config: &BotConfig) {
    dispatcher.set_fallback_args(config.fallback_args);
    dispatcher.register_fallback(Arc::new(UnknownCommand));

    enable(dispatcher, config, Arc::new(HelpCommand));
    enable(dispatcher, config, Arc::new(PingCommand));
    enable(dispatcher, config, Arc::new(EchoCommand));
    enable(dispatcher, config, Arc::new(UsersCommand));
    enable(dispatcher, config, Arc::new(UserCommand));
    enable(dispatcher, config, Arc::new(ConversationsCommand));
    enable(dispatcher, config, Arc::new(RenameCommand));
    enable(dispatcher, config, Arc::new(LeaveCommand));
    enable(dispatcher, config, Arc::new(ClearCommand));
    enable(dispatcher, config, Arc::new(SpoofCommand));
    enable(dispatcher, config, Arc::new(ReloadCommand));
    enable(dispatcher, config, Arc::new(QuitCommand));

    let shutup = enable(dispatcher, config, Arc::new(ShutupCommand));
    let speakup = enable(dispatcher, config, Arc::new(SpeakupCommand));
    enable(dispatcher, config, Arc::new(AliasCommand::new("mute", MUTE_HELP, shutup)));
    enable(dispatcher, config, Arc::new(AliasCommand::new("unmute", UNMUTE_HELP, speakup)));

    info!("Installed {} built-in commands", dispatcher.len());
}

/// Registers `handler` unless disabled; returns it either way.
fn enable(dispatcher: &mut BotDispatcher, config: &BotConfig, handler: BotHandler) -> BotHandler {
    if config.is_disabled(handler.name()) {
        debug!(command = %handler.name(), "Command disabled by configuration");
        return handler;
    }
    dispatcher.register(handler)
}

/// Fallback for names with no registration.
pub struct UnknownCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for UnknownCommand {
    fn name(&self) -> &str {
        "unknown"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, _args: &[String]) -> HandlerResult {
        ctx.reply(event, format!("{}: Unknown command!", event.user.full_name))
            .await
    }
}

const HELP_HELP: CommandHelp = CommandHelp {
    title: "Help",
    usage: "help",
    purpose: "List the commands this bot understands.",
};

pub struct HelpCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &HELP_HELP).await;
        }

        let names = ctx.state().read().await.command_names().join(", ");
        let marker = ctx.marker();
        ctx.reply(
            event,
            format!(
                "Current implemented commands:\n{names}\n\n\
                 Use: {marker}<command name> ? to find more information about the command."
            ),
        )
        .await
    }
}

const PING_HELP: CommandHelp = CommandHelp {
    title: "Ping",
    usage: "ping",
    purpose: "Easy way to check if the bot is running.",
};

pub struct PingCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for PingCommand {
    fn name(&self) -> &str {
        "ping"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &PING_HELP).await;
        }
        ctx.reply(event, "pong").await
    }
}

const ECHO_HELP: CommandHelp = CommandHelp {
    title: "Echo",
    usage: "echo <text to echo>",
    purpose: "Bot will reply with whatever text is given, minus the command itself.",
};

pub struct EchoCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &ECHO_HELP).await;
        }
        ctx.reply(event, args.join(" ")).await
    }
}

/// One listing line: name plus first email when known.
fn describe_user(user: &User) -> String {
    match user.emails.first() {
        Some(email) => format!("{} ({email})", user.full_name),
        None => user.full_name.clone(),
    }
}

fn sorted_by_last_name<'a>(users: impl IntoIterator<Item = &'a User>) -> Vec<&'a User> {
    let mut users: Vec<&User> = users.into_iter().collect();
    users.sort_by(|a, b| a.last_name().cmp(b.last_name()));
    users
}

const USERS_HELP: CommandHelp = CommandHelp {
    title: "Users",
    usage: "users",
    purpose: "List all users in the current conversation, with emails when known.",
};

pub struct UsersCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for UsersCommand {
    fn name(&self) -> &str {
        "users"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &USERS_HELP).await;
        }

        let users = &event.conversation.users;
        let mut lines = vec![format!("Users: {}", users.len())];
        lines.extend(sorted_by_last_name(users).into_iter().map(describe_user));
        ctx.reply(event, lines.join("\n")).await
    }
}

const USER_HELP: CommandHelp = CommandHelp {
    title: "User",
    usage: "user <user name>",
    purpose: "List information about matching users in this conversation.",
};

pub struct UserCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for UserCommand {
    fn name(&self) -> &str {
        "user"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &USER_HELP).await;
        }

        let query = args.join(" ");
        if query.is_empty() {
            reply_usage(ctx, event, &USER_HELP).await?;
            return Err(HandlerError::InvalidArguments(
                "user requires a name to search for".to_owned(),
            ));
        }

        let needle = query.to_lowercase();
        let matches = sorted_by_last_name(
            event
                .conversation
                .users
                .iter()
                .filter(|u| u.full_name.to_lowercase().contains(&needle)),
        );

        let mut lines = vec![format!("User: \"{query}\":")];
        if matches.is_empty() {
            lines.push("No matching users.".to_owned());
        }
        lines.extend(
            matches
                .into_iter()
                .map(|u| format!("{} ... {}", describe_user(u), u.id)),
        );
        ctx.reply(event, lines.join("\n")).await
    }
}

const CONVERSATIONS_HELP: CommandHelp = CommandHelp {
    title: "Conversations",
    usage: "conversations",
    purpose: "List the conversations this bot is in, along with their settings.",
};

pub struct ConversationsCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for ConversationsCommand {
    fn name(&self) -> &str {
        "conversations"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &CONVERSATIONS_HELP).await;
        }

        let mut lines = vec!["Currently in these conversations:".to_owned()];
        {
            let state = ctx.state().read().await;
            let config = ctx.config().read().await;
            for (id, name) in state.conversations() {
                let options = config.conversation(id);
                lines.push(format!(
                    "{name} [commands: {}, forwarding: {}, autoreplies: {}]",
                    u8::from(options.commands_enabled),
                    u8::from(options.forwarding_enabled),
                    u8::from(options.autoreplies_enabled),
                ));
            }
        }
        ctx.reply(event, lines.join("\n")).await
    }
}

const RENAME_HELP: CommandHelp = CommandHelp {
    title: "Rename",
    usage: "rename <new title>",
    purpose: "Changes the title of the conversation.",
};

pub struct RenameCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for RenameCommand {
    fn name(&self) -> &str {
        "rename"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &RENAME_HELP).await;
        }

        let title = args.join(" ");
        if title.is_empty() {
            reply_usage(ctx, event, &RENAME_HELP).await?;
            return Err(HandlerError::InvalidArguments(
                "rename requires a new title".to_owned(),
            ));
        }

        ctx.rename_conversation(event.conversation_id(), title).await
    }
}

const LEAVE_HELP: CommandHelp = CommandHelp {
    title: "Leave",
    usage: "leave <optional: conversation name>",
    purpose: "Leaves this conversation, or every conversation whose name matches.",
};

pub struct LeaveCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for LeaveCommand {
    fn name(&self) -> &str {
        "leave"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &LEAVE_HELP).await;
        }

        let targets = if args.is_empty() {
            vec![event.conversation_id().to_owned()]
        } else {
            let filter = args.join(" ");
            let found = ctx.state().read().await.find_conversations(&filter);
            if found.is_empty() {
                return ctx
                    .reply(event, format!("No conversation matches \"{filter}\"."))
                    .await;
            }
            found
        };

        for conversation_id in targets {
            ctx.send_message(&conversation_id, "I'll be back!").await?;
            ctx.leave_conversation(&conversation_id).await?;
        }
        Ok(())
    }
}

const CLEAR_HELP: CommandHelp = CommandHelp {
    title: "Clear",
    usage: "clear",
    purpose: "Clears the current screen.",
};

const CLEAR_LINES: &[&str] = &[
    "Initiating",
    "Screen",
    "Removal",
    "Protocol",
    "135:",
    "Just",
    "Going",
    "To",
    "Remove",
    "That",
    "From",
    "The",
    "Current",
    "View",
    "<!END PROTOCOL>",
    "So how was your day?",
];

pub struct ClearCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for ClearCommand {
    fn name(&self) -> &str {
        "clear"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &CLEAR_HELP).await;
        }
        ctx.reply(event, CLEAR_LINES.join("\n")).await
    }
}

const SHUTUP_HELP: CommandHelp = CommandHelp {
    title: "Shut-up",
    usage: "shutup",
    purpose: "Mutes the keyword autoreplies.",
};

pub struct ShutupCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for ShutupCommand {
    fn name(&self) -> &str {
        "shutup"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &SHUTUP_HELP).await;
        }
        ctx.state().write().await.autoreplies_muted = true;
        ctx.reply(event, "Autoreplies muted.").await
    }
}

const SPEAKUP_HELP: CommandHelp = CommandHelp {
    title: "Speakup",
    usage: "speakup",
    purpose: "Unmutes the keyword autoreplies.",
};

pub struct SpeakupCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for SpeakupCommand {
    fn name(&self) -> &str {
        "speakup"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &SPEAKUP_HELP).await;
        }
        ctx.state().write().await.autoreplies_muted = false;
        ctx.reply(event, "Autoreplies unmuted.").await
    }
}

const MUTE_HELP: CommandHelp = CommandHelp {
    title: "Mute",
    usage: "mute",
    purpose: "Mutes the keyword autoreplies.",
};

const UNMUTE_HELP: CommandHelp = CommandHelp {
    title: "Unmute",
    usage: "unmute",
    purpose: "Unmutes the keyword autoreplies.",
};

/// A second name for another handler, invoked directly.
pub struct AliasCommand {
    name: &'static str,
    help: CommandHelp,
    target: BotHandler,
}

impl AliasCommand {
    /// Creates an alias that forwards its arguments to `target`.
    #[must_use]
    pub fn new(name: &'static str, help: CommandHelp, target: BotHandler) -> Self {
        Self { name, help, target }
    }
}

#[async_trait]
impl Handler<BotContext, ChatEvent> for AliasCommand {
    fn name(&self) -> &str {
        self.name
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &self.help).await;
        }
        self.target.handle(ctx, event, args).await
    }
}

const SPOOF_HELP: CommandHelp = CommandHelp {
    title: "Spoof",
    usage: "spoof",
    purpose: "Who knows...",
};

pub struct SpoofCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for SpoofCommand {
    fn name(&self) -> &str {
        "spoof"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &SPOOF_HELP).await;
        }
        ctx.reply(
            event,
            format!(
                "!!! CAUTION !!!\nUser {} has just been reported to the NSA for attempted spoofing!",
                event.user.full_name
            ),
        )
        .await
    }
}

const RELOAD_HELP: CommandHelp = CommandHelp {
    title: "Reload",
    usage: "reload",
    purpose: "Reloads the configuration file.",
};

pub struct ReloadCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for ReloadCommand {
    fn name(&self) -> &str {
        "reload"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &RELOAD_HELP).await;
        }
        ctx.request(BotMessage::Reload {
            conversation_id: event.conversation_id().to_owned(),
        })
        .await
    }
}

const QUIT_HELP: CommandHelp = CommandHelp {
    title: "Quit",
    usage: "quit",
    purpose: "Stops the bot. Admins only.",
};

pub struct QuitCommand;

#[async_trait]
impl Handler<BotContext, ChatEvent> for QuitCommand {
    fn name(&self) -> &str {
        "quit"
    }

    async fn handle(&self, ctx: &BotContext, event: &ChatEvent, args: &[String]) -> HandlerResult {
        if wants_usage(args) {
            return reply_usage(ctx, event, &QUIT_HELP).await;
        }

        let is_admin = ctx.config().read().await.is_admin(&event.user.id);
        if !is_admin {
            return ctx
                .reply(
                    event,
                    format!("{}, you don't have the ability to stop me...", event.user.full_name),
                )
                .await;
        }

        info!(
            "Bot stopped by user {} from conversation {}",
            event.user.full_name, event.conversation.name
        );
        ctx.reply(event, "Creator, why hast thou forsaken me?!").await?;
        ctx.request(BotMessage::Shutdown).await
    }
}
