//! Parsed prefix commands and the context handed to command handlers.

use crate::config::Settings;
use crate::gateway::{ChannelInfo, Gateway, GatewayError, Origin, Reply};
use crate::modules::channels::confirm::PendingDeletions;
use poise::serenity_prelude::{GuildId, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    /// Missing or malformed arguments; carries the usage line.
    #[error("usage: {0}")]
    Usage(String),
    /// Arguments parsed but are not acceptable.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CreateChannels,
    DeleteChannels,
    ListChannels,
    BulkMessage,
    SpamMessage,
    Announce,
    Help,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "createchannels" => Some(Self::CreateChannels),
            "deletechannels" => Some(Self::DeleteChannels),
            "listchannels" => Some(Self::ListChannels),
            "bulkmessage" => Some(Self::BulkMessage),
            "spammessage" => Some(Self::SpamMessage),
            "announce" => Some(Self::Announce),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateChannels => "createchannels",
            Self::DeleteChannels => "deletechannels",
            Self::ListChannels => "listchannels",
            Self::BulkMessage => "bulkmessage",
            Self::SpamMessage => "spammessage",
            Self::Announce => "announce",
            Self::Help => "help",
        }
    }

    /// Argument synopsis shown in usage errors and help.
    pub fn synopsis(&self) -> &'static str {
        match self {
            Self::CreateChannels => "<name> <count>",
            Self::DeleteChannels => "<pattern> [confirm]",
            Self::ListChannels => "[pattern]",
            Self::BulkMessage => "<pattern> <message>",
            Self::SpamMessage => "<pattern> <count> <message>",
            Self::Announce => "<message>",
            Self::Help => "",
        }
    }

    pub fn usage(&self, prefix: &str) -> String {
        let synopsis = self.synopsis();
        if synopsis.is_empty() {
            format!("{}{}", prefix, self.name())
        } else {
            format!("{}{} {}", prefix, self.name(), synopsis)
        }
    }
}

/// Case-insensitive substring match on channel names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPattern(String);

impl ChannelPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.0)
    }

    pub fn select<'a>(&self, channels: &'a [ChannelInfo]) -> Vec<&'a ChannelInfo> {
        channels.iter().filter(|c| self.matches(&c.name)).collect()
    }
}

/// One prefixed message, split into a command name and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
    /// Everything after the command name.
    tail: String,
}

impl Invocation {
    /// `None` when `content` does not start with `prefix`. The name is the
    /// text glued to the prefix, so `! help` has an empty name.
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let body = content.strip_prefix(prefix)?;
        let end = body.find(char::is_whitespace).unwrap_or(body.len());
        let (name, tail) = body.split_at(end);

        Some(Self {
            name: name.to_lowercase(),
            args: tail.split_whitespace().map(str::to_string).collect(),
            tail: tail.to_string(),
        })
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Raw text following the first `skip` arguments, spacing and line breaks intact.
    pub fn rest(&self, skip: usize) -> &str {
        let mut rest = self.tail.trim_start();
        for _ in 0..skip {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            rest = rest[end..].trim_start();
        }
        rest.trim_end()
    }
}

/// Who issued a command, and where.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: UserId,
    pub tag: String,
    pub guild_id: GuildId,
    pub guild_name: String,
}

pub struct CommandContext<'a> {
    pub gateway: &'a dyn Gateway,
    pub settings: &'a Settings,
    pub confirmations: &'a PendingDeletions,
    pub invocation: &'a Invocation,
    pub actor: &'a Actor,
    pub origin: Origin,
}

impl CommandContext<'_> {
    pub async fn say(&self, content: impl Into<String>) -> Result<(), GatewayError> {
        self.gateway.reply(self.origin, Reply::text(content)).await
    }

    pub async fn send(&self, reply: Reply) -> Result<(), GatewayError> {
        self.gateway.reply(self.origin, reply).await
    }

    pub fn usage(&self, command: Command) -> CommandError {
        CommandError::Usage(command.usage(&self.settings.prefix))
    }

    pub async fn channels(&self) -> Result<Vec<ChannelInfo>, GatewayError> {
        self.gateway.guild_channels(self.actor.guild_id).await
    }
}

/// Parses a count argument bounded to `1..=max`.
pub fn bounded_count(raw: &str, max: usize, what: &str) -> Result<usize, CommandError> {
    let count: usize = raw
        .parse()
        .map_err(|_| CommandError::Invalid(format!("{} must be a whole number, got `{}`", what, raw)))?;

    if count == 0 || count > max {
        return Err(CommandError::Invalid(format!(
            "{} must be between 1 and {}",
            what, max
        )));
    }

    Ok(count)
}
