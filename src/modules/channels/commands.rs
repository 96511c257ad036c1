use super::confirm::DeletionKey;
use crate::bulk::run_bulk;
use crate::command::{bounded_count, ChannelPattern, Command, CommandContext, CommandError};
use crate::gateway::ChannelInfo;
use crate::utils::{plural, preview_list};
use poise::serenity_prelude::ChannelId;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Longest base name accepted; Discord caps channel names at 100 characters.
const MAX_BASE_NAME: usize = 90;
/// Characters per `listchannels` reply, below Discord's 2000 limit.
const PAGE_CHARS: usize = 1900;
const MAX_PAGES: usize = 5;
const PREVIEW_NAMES: usize = 10;

/// `createchannels <name> <count>`: creates `<name>-1` … `<name>-<count>`.
pub async fn create_channels(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let (base, raw_count) = match (ctx.invocation.arg(0), ctx.invocation.arg(1)) {
        (Some(base), Some(count)) => (base, count),
        _ => return Err(ctx.usage(Command::CreateChannels)),
    };

    if base.chars().count() > MAX_BASE_NAME {
        return Err(CommandError::Invalid(format!(
            "Channel name must be at most {} characters",
            MAX_BASE_NAME
        )));
    }

    let count = bounded_count(raw_count, ctx.settings.limits.max_channels, "Channel count")?;
    let guild_id = ctx.actor.guild_id;

    ctx.say(format!("⏳ Creating {}…", plural(count, "channel")))
        .await?;

    let targets: Vec<(String, String)> = (1..=count)
        .map(|i| {
            let name = format!("{}-{}", base, i);
            (name.clone(), name)
        })
        .collect();

    let gateway = ctx.gateway;
    let tally = run_bulk(targets, ctx.settings.throttle.channels, |name| async move {
        gateway.create_text_channel(guild_id, &name).await.map(|_| ())
    })
    .await?;

    info!(
        "Created {} of {} channels in guild {}",
        tally.succeeded, count, guild_id
    );
    ctx.say(format!("✅ {}", tally.report("Channel creation complete")))
        .await?;
    Ok(())
}

/// `deletechannels <pattern> [confirm]`: previews, then deletes once confirmed.
pub async fn delete_channels(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let raw_pattern = ctx
        .invocation
        .arg(0)
        .ok_or_else(|| ctx.usage(Command::DeleteChannels))?;

    let confirmed = match ctx.invocation.arg(1) {
        None => false,
        Some(word) if word.eq_ignore_ascii_case("confirm") => true,
        Some(_) => return Err(ctx.usage(Command::DeleteChannels)),
    };

    let pattern = ChannelPattern::new(raw_pattern);
    let key = DeletionKey::new(ctx.actor.user_id, ctx.actor.guild_id, pattern.as_str());
    let prefix = &ctx.settings.prefix;

    if confirmed && !ctx.confirmations.take(&key) {
        ctx.say(format!(
            "❌ No pending deletion for `{}`. Run `{}deletechannels {}` first, then confirm within {} seconds.",
            pattern.as_str(),
            prefix,
            pattern.as_str(),
            ctx.confirmations.window().as_secs()
        ))
        .await?;
        return Ok(());
    }

    let channels = ctx.channels().await?;
    let mut matched: Vec<&ChannelInfo> = pattern.select(&channels);

    if matched.is_empty() {
        ctx.say(format!("❌ No channels match `{}`.", pattern.as_str()))
            .await?;
        return Ok(());
    }

    if !confirmed {
        let names: Vec<String> = matched.iter().map(|c| format!("#{}", c.name)).collect();
        ctx.confirmations.arm(key);
        ctx.say(format!(
            "⚠️ This will permanently delete {} matching `{}`:\n{}\n\nRun `{}deletechannels {} confirm` within {} seconds to proceed.",
            plural(matched.len(), "channel"),
            pattern.as_str(),
            preview_list(&names, PREVIEW_NAMES, "channels"),
            prefix,
            pattern.as_str(),
            ctx.confirmations.window().as_secs()
        ))
        .await?;
        return Ok(());
    }

    // The invoking channel goes last so progress replies keep working.
    matched.sort_by_key(|c| c.id == ctx.origin.channel_id);

    ctx.say(format!("🗑️ Deleting {}…", plural(matched.len(), "channel")))
        .await?;

    let targets: Vec<(String, ChannelId)> =
        matched.iter().map(|c| (c.name.clone(), c.id)).collect();
    let gateway = ctx.gateway;
    let origin_id = ctx.origin.channel_id;
    let origin_deleted = AtomicBool::new(false);
    let tally = run_bulk(targets, ctx.settings.throttle.channels, |id| {
        let origin_deleted = &origin_deleted;
        async move {
            let result = gateway.delete_channel(id).await;
            if result.is_ok() && id == origin_id {
                origin_deleted.store(true, Ordering::Relaxed);
            }
            result
        }
    })
    .await?;

    info!(
        "Deleted {} channels matching {:?} in guild {}",
        tally.succeeded,
        pattern.as_str(),
        ctx.actor.guild_id
    );

    let report = tally.report("Channel deletion complete");
    if origin_deleted.load(Ordering::Relaxed) {
        info!("{} (invoking channel was deleted)", report);
    } else {
        ctx.say(format!("✅ {}", report)).await?;
    }
    Ok(())
}

/// `listchannels [pattern]`
pub async fn list_channels(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    let pattern = ctx.invocation.arg(0).map(ChannelPattern::new);

    let mut channels = ctx.channels().await?;
    if let Some(pattern) = &pattern {
        channels.retain(|c| pattern.matches(&c.name));
    }
    channels.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));

    if channels.is_empty() {
        let msg = match &pattern {
            Some(p) => format!("📁 No channels match `{}`.", p.as_str()),
            None => "📁 This server has no channels.".to_string(),
        };
        ctx.say(msg).await?;
        return Ok(());
    }

    let header = match &pattern {
        Some(p) => format!(
            "📁 **Channels matching `{}`** ({} total)",
            p.as_str(),
            channels.len()
        ),
        None => format!("📁 **All channels** ({} total)", channels.len()),
    };

    let lines: Vec<String> = channels.iter().map(|c| format!("• #{}", c.name)).collect();
    for page in paginate(&header, &lines, PAGE_CHARS, MAX_PAGES) {
        ctx.say(page).await?;
    }
    Ok(())
}

/// Packs `lines` into pages of at most `page_chars` characters, the first one
/// starting with `header`. Beyond `max_pages` the remainder is summarised.
pub fn paginate(header: &str, lines: &[String], page_chars: usize, max_pages: usize) -> Vec<String> {
    let mut pages: Vec<String> = Vec::new();
    let mut current = header.to_string();
    let mut shown = 0;

    for line in lines {
        let needed = current.chars().count() + 1 + line.chars().count();
        if needed > page_chars && !current.is_empty() {
            if pages.len() + 1 == max_pages {
                break;
            }
            pages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        shown += 1;
    }

    if shown < lines.len() {
        let footer = format!("…and {} more channels not shown", lines.len());
        while current.chars().count() + 1 + footer.chars().count() > page_chars {
            match current.rfind('\n') {
                Some(cut) => {
                    current.truncate(cut);
                    shown -= 1;
                }
                None => break,
            }
        }
        let footer = format!("…and {} more channels not shown", lines.len() - shown);
        current.push('\n');
        current.push_str(&footer);
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}
