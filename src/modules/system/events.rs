use super::health::HealthState;
use crate::activity::{ActivityKind, ActivityLogger};
use crate::events::EventHandler;
use async_trait::async_trait;
use poise::serenity_prelude::{ActivityData, Context, FullEvent, OnlineStatus};
use serde_json::json;
use tracing::info;

pub fn presence_text(prefix: &str) -> String {
    format!("Server Management | {}help", prefix)
}

#[derive(Debug, Clone)]
pub struct ReadyHandler {
    prefix: String,
    activity: ActivityLogger,
    health: HealthState,
}

impl ReadyHandler {
    pub fn new(prefix: String, activity: ActivityLogger, health: HealthState) -> Self {
        Self {
            prefix,
            activity,
            health,
        }
    }
}

#[async_trait]
impl EventHandler for ReadyHandler {
    fn name(&self) -> &str {
        "Ready"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let FullEvent::Ready { data_about_bot } = event {
            let tag = data_about_bot.user.tag();
            let servers = data_about_bot.guilds.len();

            ctx.set_presence(
                Some(ActivityData::watching(presence_text(&self.prefix))),
                OnlineStatus::Online,
            );

            info!("Logged in as {}", tag);
            info!("Serving {} servers", servers);

            self.health.set_bot_tag(tag.clone()).await;
            self.health.set_guild_count(servers);
            self.activity.log(
                ActivityKind::BotStarted,
                json!({ "botTag": tag, "serverCount": servers }),
            );
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}

/// Keeps the health endpoint's server count current.
#[derive(Debug, Clone)]
pub struct GuildCountHandler {
    health: HealthState,
}

impl GuildCountHandler {
    pub fn new(health: HealthState) -> Self {
        Self { health }
    }
}

#[async_trait]
impl EventHandler for GuildCountHandler {
    fn name(&self) -> &str {
        "GuildCount"
    }

    async fn handle(
        &self,
        _ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event {
            FullEvent::GuildCreate {
                guild,
                is_new: Some(true),
            } => {
                info!("Joined guild {} ({})", guild.name, guild.id);
                self.health.guild_joined();
            }
            // An unavailable guild is an outage, not a removal.
            FullEvent::GuildDelete { incomplete, .. } if !incomplete.unavailable => {
                info!("Removed from guild {}", incomplete.id);
                self.health.guild_left();
            }
            _ => {}
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
