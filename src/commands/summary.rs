//! Implements the `/summary` command.
//!
//! Shows the summary as it would be posted right now, only to the invoker.
//! Unlike the scheduled summary this never resets the responses.

use poise::CreateReply;
use tracing::instrument;

use crate::error::UserError;
use crate::lib::gateway::Gateway;
use crate::lib::gateway::SerenityGateway;
use crate::lib::summary::SummaryReport;
use crate::BotError;
use crate::Context;

/// Preview today's summary
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, user_cooldown = 5)]
pub async fn summary(ctx: Context<'_>) -> Result<(), BotError> {
    let guild = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    let http = ctx.serenity_context().http.clone();
    let gateway = SerenityGateway::new(http, guild, ctx.channel_id());

    // Fetching every member can take a moment on large guilds.
    ctx.defer_ephemeral().await?;

    let roster = gateway.members().await?;
    let tally = ctx.data().store.snapshot().await;
    let report = SummaryReport::build(&roster, &tally, &gateway).await;

    let reply = CreateReply::default().ephemeral(true).content(report.render());
    ctx.send(reply).await?;
    Ok(())
}
