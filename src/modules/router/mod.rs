//! Turns inbound chat messages into command executions.

pub mod handler;
pub mod help;
pub mod permissions;

use crate::activity::{ActivityKind, ActivityLogger};
use crate::command::{Actor, Command, CommandContext, CommandError, Invocation};
use crate::config::Settings;
use crate::gateway::{Gateway, Origin, Reply};
use crate::modules::channels::{self, confirm::PendingDeletions};
use crate::modules::messages;
use futures::FutureExt;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DENIED_REPLY: &str = "❌ You must be an administrator to use this bot.";
pub const FAILURE_REPLY: &str =
    "❌ An error occurred while processing your command. Please try again.";

/// The parts of a chat message the router cares about.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub author_id: UserId,
    pub author_tag: String,
    pub author_is_bot: bool,
    pub guild_id: Option<GuildId>,
    pub guild_name: Option<String>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not for us: bot author, no guild, no prefix, or unresolvable member.
    Ignored,
    Denied,
    Unknown,
    Completed(Command),
    /// Bad arguments; the user got a usage or validation reply.
    Rejected(Command),
    /// The handler failed; the user got the generic failure reply.
    Failed(Command),
}

pub struct Router {
    gateway: Arc<dyn Gateway>,
    settings: Settings,
    confirmations: Arc<PendingDeletions>,
    activity: ActivityLogger,
}

impl Router {
    pub fn new(gateway: Arc<dyn Gateway>, settings: Settings, activity: ActivityLogger) -> Self {
        let confirmations = Arc::new(PendingDeletions::new(settings.confirm_window));
        Self {
            gateway,
            settings,
            confirmations,
            activity,
        }
    }

    pub fn confirmations(&self) -> Arc<PendingDeletions> {
        self.confirmations.clone()
    }

    pub async fn route(&self, msg: &InboundMessage) -> Outcome {
        if msg.author_is_bot {
            return Outcome::Ignored;
        }

        let Some(guild_id) = msg.guild_id else {
            return Outcome::Ignored;
        };

        let Some(invocation) = Invocation::parse(&msg.content, &self.settings.prefix) else {
            return Outcome::Ignored;
        };

        let permissions = match self.gateway.member_permissions(guild_id, msg.author_id).await {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(
                    "Failed to resolve member {} in guild {}: {}",
                    msg.author_id, guild_id, e
                );
                return Outcome::Ignored;
            }
        };

        let actor = Actor {
            user_id: msg.author_id,
            tag: msg.author_tag.clone(),
            guild_id,
            guild_name: msg
                .guild_name
                .clone()
                .unwrap_or_else(|| guild_id.to_string()),
        };
        let origin = Origin {
            channel_id: msg.channel_id,
            message_id: msg.message_id,
        };

        if !permissions::is_authorized(permissions) {
            debug!("Denied {} to {} in {}", invocation.name, actor.tag, guild_id);
            self.activity.log(
                ActivityKind::CommandDenied,
                json!({
                    "command": invocation.name,
                    "user": actor.tag,
                    "userId": actor.user_id.to_string(),
                    "guild": actor.guild_name,
                    "guildId": guild_id.to_string(),
                }),
            );
            self.reply_quietly(origin, DENIED_REPLY).await;
            return Outcome::Denied;
        }

        self.activity.log(
            ActivityKind::CommandUsed,
            json!({
                "command": invocation.name,
                "user": actor.tag,
                "userId": actor.user_id.to_string(),
                "guild": actor.guild_name,
                "guildId": guild_id.to_string(),
            }),
        );

        let Some(command) = Command::from_name(&invocation.name) else {
            self.reply_quietly(
                origin,
                &format!(
                    "❓ Unknown command. Use `{}help` to see available commands.",
                    self.settings.prefix
                ),
            )
            .await;
            return Outcome::Unknown;
        };

        let ctx = CommandContext {
            gateway: self.gateway.as_ref(),
            settings: &self.settings,
            confirmations: &self.confirmations,
            invocation: &invocation,
            actor: &actor,
            origin,
        };

        let result = match AssertUnwindSafe(dispatch(command, &ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                return self
                    .fail(command, &actor, origin, "command handler panicked".to_string())
                    .await
            }
        };

        match result {
            Ok(()) => {
                info!(
                    "Command {} completed for {} in {}",
                    command.name(),
                    actor.tag,
                    guild_id
                );
                Outcome::Completed(command)
            }
            Err(CommandError::Usage(usage)) => {
                self.reply_quietly(origin, &format!("❌ Usage: `{}`", usage))
                    .await;
                Outcome::Rejected(command)
            }
            Err(CommandError::Invalid(reason)) => {
                self.reply_quietly(origin, &format!("❌ {}", reason)).await;
                Outcome::Rejected(command)
            }
            Err(CommandError::Gateway(e)) => self.fail(command, &actor, origin, e.to_string()).await,
        }
    }

    async fn fail(&self, command: Command, actor: &Actor, origin: Origin, reason: String) -> Outcome {
        error!(
            "Command {} failed for {} in {}: {}",
            command.name(),
            actor.tag,
            actor.guild_id,
            reason
        );
        self.activity.log(
            ActivityKind::CommandError,
            json!({
                "command": command.name(),
                "error": reason,
                "user": actor.tag,
                "userId": actor.user_id.to_string(),
                "guild": actor.guild_name,
                "guildId": actor.guild_id.to_string(),
            }),
        );
        self.reply_quietly(origin, FAILURE_REPLY).await;
        Outcome::Failed(command)
    }

    async fn reply_quietly(&self, origin: Origin, content: &str) {
        if let Err(e) = self.gateway.reply(origin, Reply::text(content)).await {
            warn!("Failed to reply in channel {}: {}", origin.channel_id, e);
        }
    }
}

async fn dispatch(command: Command, ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    match command {
        Command::CreateChannels => channels::create_channels(ctx).await,
        Command::DeleteChannels => channels::delete_channels(ctx).await,
        Command::ListChannels => channels::list_channels(ctx).await,
        Command::BulkMessage => messages::bulk_message(ctx).await,
        Command::SpamMessage => messages::spam_message(ctx).await,
        Command::Announce => messages::announce(ctx).await,
        Command::Help => help::show_help(ctx).await,
    }
}
