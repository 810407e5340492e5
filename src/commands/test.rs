//! Implements the `!test` prefix command.

use tracing::instrument;

use crate::BotError;
use crate::Context;

/// Check that prefix commands work.
#[instrument(skip(ctx))]
#[poise::command(prefix_command, rename = "test")]
pub async fn test_command(ctx: Context<'_>) -> Result<(), BotError> {
    ctx.say("Bot is working with prefix commands too!").await?;
    Ok(())
}
