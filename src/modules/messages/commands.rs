use crate::bulk::run_bulk;
use crate::command::{bounded_count, ChannelPattern, Command, CommandContext, CommandError};
use crate::gateway::ChannelInfo;
use crate::utils::plural;
use poise::serenity_prelude::ChannelId;
use tracing::info;

fn check_length(ctx: &CommandContext<'_>, text: &str) -> Result<(), CommandError> {
    let max = ctx.settings.limits.max_message_len;
    let len = text.chars().count();
    if len > max {
        return Err(CommandError::Invalid(format!(
            "Message is too long ({} characters, maximum is {})",
            len, max
        )));
    }
    Ok(())
}

/// Text channels whose names match `pattern`, or every text channel.
async fn text_channels(
    ctx: &CommandContext<'_>,
    pattern: Option<&ChannelPattern>,
) -> Result<Vec<ChannelInfo>, CommandError> {
    let mut channels: Vec<ChannelInfo> = ctx
        .channels()
        .await?
        .into_iter()
        .filter(|c| c.is_text_capable())
        .filter(|c| pattern.map_or(true, |p| p.matches(&c.name)))
        .collect();
    channels.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
    Ok(channels)
}

/// Sends `text` `repeats` times to each channel, one throttled call at a time.
async fn broadcast(
    ctx: &CommandContext<'_>,
    channels: &[ChannelInfo],
    repeats: usize,
    text: &str,
    title: &str,
) -> Result<(), CommandError> {
    let total = channels.len() * repeats;
    ctx.say(format!(
        "⏳ Sending {} to {}…",
        plural(total, "message"),
        plural(channels.len(), "channel")
    ))
    .await?;

    let targets: Vec<(String, ChannelId)> = channels
        .iter()
        .flat_map(|c| (0..repeats).map(move |_| (format!("#{}", c.name), c.id)))
        .collect();

    let gateway = ctx.gateway;
    let tally = run_bulk(targets, ctx.settings.throttle.messages, |id| async move {
        gateway.send_message(id, text).await
    })
    .await?;

    info!(
        "{}: {} of {} messages delivered in guild {}",
        title, tally.succeeded, total, ctx.actor.guild_id
    );
    ctx.say(format!("✅ {}", tally.report(title))).await?;
    Ok(())
}

/// `bulkmessage <pattern> <message>`
pub async fn bulk_message(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let raw_pattern = ctx.invocation.arg(0);
    let text = ctx.invocation.rest(1);
    let raw_pattern = match raw_pattern {
        Some(p) if !text.is_empty() => p,
        _ => return Err(ctx.usage(Command::BulkMessage)),
    };
    check_length(ctx, text)?;

    let pattern = ChannelPattern::new(raw_pattern);
    let channels = text_channels(ctx, Some(&pattern)).await?;
    if channels.is_empty() {
        ctx.say(format!("❌ No text channels match `{}`.", pattern.as_str()))
            .await?;
        return Ok(());
    }

    broadcast(ctx, &channels, 1, text, "Bulk message complete").await
}

/// `spammessage <pattern> <count> <message>`
pub async fn spam_message(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let text = ctx.invocation.rest(2);
    let (raw_pattern, raw_count) = match (ctx.invocation.arg(0), ctx.invocation.arg(1)) {
        (Some(p), Some(c)) if !text.is_empty() => (p, c),
        _ => return Err(ctx.usage(Command::SpamMessage)),
    };
    let repeats = bounded_count(raw_count, ctx.settings.limits.max_repeats, "Message count")?;
    check_length(ctx, text)?;

    let pattern = ChannelPattern::new(raw_pattern);
    let channels = text_channels(ctx, Some(&pattern)).await?;
    if channels.is_empty() {
        ctx.say(format!("❌ No text channels match `{}`.", pattern.as_str()))
            .await?;
        return Ok(());
    }

    broadcast(ctx, &channels, repeats, text, "Spam message complete").await
}

/// `announce <message>`: every text channel in the server.
pub async fn announce(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let text = ctx.invocation.rest(0);
    if text.is_empty() {
        return Err(ctx.usage(Command::Announce));
    }
    check_length(ctx, text)?;

    let channels = text_channels(ctx, None).await?;
    if channels.is_empty() {
        ctx.say("❌ This server has no text channels.").await?;
        return Ok(());
    }

    broadcast(ctx, &channels, 1, text, "Announcement complete").await
}
