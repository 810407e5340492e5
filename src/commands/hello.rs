//! Implements the `/hello` command.

use serenity::Mentionable;
use tracing::instrument;

use crate::serenity;
use crate::BotError;
use crate::Context;

/// Say hello!
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn hello(ctx: Context<'_>) -> Result<(), BotError> {
    let mention = ctx.author().mention();
    ctx.say(format!("Hello {mention}!")).await?;
    Ok(())
}
