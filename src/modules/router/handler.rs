use super::{InboundMessage, Outcome, Router};
use crate::events::EventHandler;
use async_trait::async_trait;
use poise::serenity_prelude::{Context, FullEvent, Message};
use std::sync::Arc;
use tracing::trace;

/// Feeds every created message into the [`Router`].
#[derive(Clone)]
pub struct CommandHandler {
    router: Arc<Router>,
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

impl CommandHandler {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

fn inbound(ctx: &Context, msg: &Message) -> InboundMessage {
    let own_id = ctx.cache.current_user().id;
    let guild_name = msg
        .guild_id
        .and_then(|id| ctx.cache.guild(id).map(|guild| guild.name.clone()));

    InboundMessage {
        author_id: msg.author.id,
        author_tag: msg.author.tag(),
        author_is_bot: msg.author.bot || msg.author.id == own_id,
        guild_id: msg.guild_id,
        guild_name,
        channel_id: msg.channel_id,
        message_id: msg.id,
        content: msg.content.clone(),
    }
}

#[async_trait]
impl EventHandler for CommandHandler {
    fn name(&self) -> &str {
        "Command"
    }

    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let FullEvent::Message { new_message } = event {
            let msg = inbound(ctx, new_message);
            let outcome = self.router.route(&msg).await;
            if outcome != Outcome::Ignored {
                trace!("Message {} routed: {:?}", msg.message_id, outcome);
            }
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
