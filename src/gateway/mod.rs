//! The bot's handle on Discord.
//!
//! Command code only talks to Discord through [`Gateway`], so the router and
//! the bulk handlers can run against an in-memory fake in tests.

pub mod discord;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, ChannelType, GuildId, MessageId, Permissions, UserId};
use thiserror::Error;

pub use discord::SerenityGateway;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("missing permissions: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("connection lost: {0}")]
    Connection(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl GatewayError {
    /// Errors after which further calls in the same loop cannot succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Connection(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelType,
    pub position: u16,
}

impl ChannelInfo {
    pub fn is_text_capable(&self) -> bool {
        matches!(self.kind, ChannelType::Text | ChannelType::News)
    }
}

/// The message a command was issued from; replies reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub colour: u32,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Embed(Embed),
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    #[cfg(test)]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(content) => Some(content),
            Self::Embed(_) => None,
        }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Guild-level permissions of a member, fetching the member if it is not cached.
    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Permissions, GatewayError>;

    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelInfo>, GatewayError>;

    async fn create_text_channel(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<ChannelInfo, GatewayError>;

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), GatewayError>;

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), GatewayError>;

    async fn reply(&self, origin: Origin, reply: Reply) -> Result<(), GatewayError>;
}
