//! Event handling

use crate::lib::collector;
use crate::serenity;
use crate::BotError;
use crate::Data;

/// Reacts to gateway events that aren't commands.
/// Button presses go to the [collector], (re)connects make sure the scheduler runs.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, BotError>,
    data: &Data,
) -> Result<(), BotError> {
    match event {
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(component),
        } => collector::handle_component(ctx, component, &data.store).await?,

        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("{} connected to the gateway.", data_about_bot.user.name);

            // Starting is a no-op after the first ready.
            if let Some(scheduler) = &data.scheduler {
                if !scheduler.start() {
                    tracing::debug!("Jobs: {:?}", scheduler.states().await);
                }
            }
        }

        serenity::FullEvent::Resume { .. } => tracing::info!("Gateway session resumed."),

        _ => {}
    }
    Ok(())
}
