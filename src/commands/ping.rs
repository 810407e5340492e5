//! Implements the `/ping` command.

use tracing::instrument;

use crate::BotError;
use crate::Context;

/// Check bot latency
#[instrument(skip(ctx))]
#[poise::command(slash_command, user_cooldown = 2)]
pub async fn ping(ctx: Context<'_>) -> Result<(), BotError> {
    // Zero until the shard has sent its first heartbeat.
    let latency = ctx.ping().await.as_millis();
    ctx.say(format!("Pong! Latency: {latency}ms")).await?;
    Ok(())
}
