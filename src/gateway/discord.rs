use super::{ChannelInfo, Embed, Gateway, GatewayError, Origin, Reply};
use async_trait::async_trait;
use poise::serenity_prelude::{
    Cache, ChannelId, ChannelType, CreateChannel, CreateEmbed, CreateEmbedFooter, CreateMessage,
    GuildChannel, GuildId, Http, Permissions, Role, RoleId, Timestamp, UserId,
};
use serenity::http::HttpError;
use serenity::Error as SerenityError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Longest text Discord accepts as plain message content.
const CONTENT_LIMIT: usize = 2000;

/// [`Gateway`] backed by the live serenity client.
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn cache_http(&self) -> (&Arc<Cache>, &Http) {
        (&self.cache, self.http.as_ref())
    }
}

impl From<SerenityError> for GatewayError {
    fn from(err: SerenityError) -> Self {
        match &err {
            SerenityError::Http(HttpError::UnsuccessfulRequest(resp)) => {
                let message = err.to_string();
                match resp.status_code.as_u16() {
                    401 => Self::Unauthorized(message),
                    403 => Self::Forbidden(message),
                    404 => Self::NotFound(message),
                    429 => Self::RateLimited(message),
                    _ => Self::Request(message),
                }
            }
            SerenityError::Http(HttpError::Request(e)) => Self::Connection(e.to_string()),
            SerenityError::Gateway(e) => Self::Connection(e.to_string()),
            _ => Self::Request(err.to_string()),
        }
    }
}

fn channel_info(channel: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: channel.id,
        name: channel.name.clone(),
        kind: channel.kind,
        position: channel.position,
    }
}

fn role_permissions(roles: &HashMap<RoleId, Role>) -> HashMap<RoleId, Permissions> {
    roles
        .iter()
        .map(|(id, role)| (*id, role.permissions))
        .collect()
}

fn guild_permissions(
    guild_id: GuildId,
    owner_id: UserId,
    roles: &HashMap<RoleId, Permissions>,
    user_id: UserId,
    member_roles: &[RoleId],
) -> Permissions {
    if owner_id == user_id {
        return Permissions::all();
    }

    let mut permissions = roles
        .get(&guild_id.everyone_role())
        .copied()
        .unwrap_or_else(Permissions::empty);

    for role_id in member_roles {
        if let Some(granted) = roles.get(role_id) {
            permissions |= *granted;
        }
    }

    permissions
}

fn build_embed(embed: Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new()
        .title(embed.title)
        .description(embed.description)
        .colour(embed.colour)
        .timestamp(Timestamp::now());

    for field in embed.fields {
        builder = builder.field(field.name, field.value, field.inline);
    }

    if let Some(footer) = embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer));
    }

    builder
}

#[async_trait]
impl Gateway for SerenityGateway {
    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Permissions, GatewayError> {
        let member = guild_id.member(self.cache_http(), user_id).await?;

        let cached = self
            .cache
            .guild(guild_id)
            .map(|guild| (guild.owner_id, role_permissions(&guild.roles)));

        let (owner_id, roles) = match cached {
            Some(found) => found,
            None => {
                debug!("Guild {} not cached, fetching roles", guild_id);
                let guild = self.http.get_guild(guild_id).await?;
                (guild.owner_id, role_permissions(&guild.roles))
            }
        };

        Ok(guild_permissions(
            guild_id,
            owner_id,
            &roles,
            user_id,
            &member.roles,
        ))
    }

    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelInfo>, GatewayError> {
        let cached: Option<Vec<ChannelInfo>> = self
            .cache
            .guild(guild_id)
            .map(|guild| guild.channels.values().map(channel_info).collect());

        if let Some(channels) = cached {
            return Ok(channels);
        }

        let channels = self.http.get_channels(guild_id).await?;
        Ok(channels.iter().map(channel_info).collect())
    }

    async fn create_text_channel(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<ChannelInfo, GatewayError> {
        let builder = CreateChannel::new(name).kind(ChannelType::Text);
        let channel = guild_id.create_channel(self.cache_http(), builder).await?;
        Ok(channel_info(&channel))
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<(), GatewayError> {
        channel_id.delete(self.cache_http()).await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), GatewayError> {
        let message = if content.chars().count() <= CONTENT_LIMIT {
            CreateMessage::new().content(content)
        } else {
            CreateMessage::new().embed(CreateEmbed::new().description(content))
        };

        channel_id.send_message(self.cache_http(), message).await?;
        Ok(())
    }

    async fn reply(&self, origin: Origin, reply: Reply) -> Result<(), GatewayError> {
        let message = match reply {
            Reply::Text(content) => CreateMessage::new().content(content),
            Reply::Embed(embed) => CreateMessage::new().embed(build_embed(embed)),
        };

        origin
            .channel_id
            .send_message(
                self.cache_http(),
                message.reference_message((origin.channel_id, origin.message_id)),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: u64, permissions: Permissions) -> (RoleId, Permissions) {
        (RoleId::new(id), permissions)
    }

    #[test]
    fn owner_has_every_permission() {
        let guild = GuildId::new(10);
        let perms = guild_permissions(guild, UserId::new(5), &HashMap::new(), UserId::new(5), &[]);
        assert!(perms.administrator());
    }

    #[test]
    fn permissions_union_everyone_and_member_roles() {
        let guild = GuildId::new(10);
        let roles: HashMap<RoleId, Permissions> = [
            role(10, Permissions::SEND_MESSAGES),
            role(20, Permissions::ADMINISTRATOR),
            role(30, Permissions::MANAGE_CHANNELS),
        ]
        .into_iter()
        .collect();

        let member = guild_permissions(guild, UserId::new(1), &roles, UserId::new(2), &[RoleId::new(30)]);
        assert!(member.send_messages());
        assert!(member.manage_channels());
        assert!(!member.administrator());

        let admin = guild_permissions(guild, UserId::new(1), &roles, UserId::new(3), &[RoleId::new(20)]);
        assert!(admin.administrator());
    }
}
