//! Implements the `/task` command.
//!
//! Posts a random task with the response buttons in the current channel,
//! the same way the scheduled post does. Answers go to the same tally.

use poise::CreateReply;
use serenity::CreateAttachment;
use tracing::instrument;

use crate::lib::collector;
use crate::lib::jobs;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// Post a random task right now.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, channel_cooldown = 10)]
pub async fn task(ctx: Context<'_>) -> Result<(), BotError> {
    let data = ctx.data();
    let task = data.catalog.pick_task()?;
    let asset = data.catalog.pick_asset()?;

    // Answers to this post must land in an existing tally.
    data.store.ensure_initialized().await?;

    let attachment = CreateAttachment::path(asset).await?;
    let reply = CreateReply::default()
        .content(jobs::task_message(task, None))
        .attachment(attachment)
        .components(collector::components());

    tracing::info!("Posting task on request: {task}");
    ctx.send(reply).await?;
    Ok(())
}
