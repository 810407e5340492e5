//! Response buttons attached to task posts.
//!
//! Every task message carries three buttons, one per [Category]. Pressing one
//! records the presser's answer (replacing any earlier one) and replies privately.

use serenity::ButtonStyle;
use serenity::ComponentInteraction;
use serenity::CreateActionRow;
use serenity::CreateButton;
use serenity::CreateInteractionResponse;
use serenity::CreateInteractionResponseMessage;
use serenity::UserId;
use tracing::instrument;

use crate::data::Category;
use crate::data::ResponseStore;
use crate::error::StorageError;
use crate::serenity;
use crate::BotError;

/// Reply when saving an answer failed.
const FAILURE_REPLY: &str = "Something went wrong while saving your response. Please try again later.";

/// Custom id of the button for `category`.
pub fn custom_id(category: Category) -> &'static str {
    match category {
        Category::Completed => "daily_task:completed",
        Category::Attempted => "daily_task:attempted",
        Category::Skipped => "daily_task:skipped",
    }
}

/// The category a button's custom id stands for, if it's one of ours.
pub fn parse_custom_id(id: &str) -> Option<Category> {
    Category::ALL.into_iter().find(|&c| custom_id(c) == id)
}

/// Private reply confirming the answer.
pub fn acknowledgement(category: Category) -> &'static str {
    match category {
        Category::Completed => "Awesome! Your completion has been recorded. ✅",
        Category::Attempted => "Nice effort! Your attempt has been recorded. 💪",
        Category::Skipped => "No worries, there's always tomorrow. Your skip has been recorded. ⏭️",
    }
}

fn button(category: Category) -> CreateButton {
    let (label, style) = match category {
        Category::Completed => ("✅ Completed", ButtonStyle::Success),
        Category::Attempted => ("💪 Attempted", ButtonStyle::Primary),
        Category::Skipped => ("⏭️ Skipped", ButtonStyle::Secondary),
    };
    CreateButton::new(custom_id(category)).label(label).style(style)
}

/// The row of response buttons.
pub fn components() -> Vec<CreateActionRow> {
    let buttons = Category::ALL.into_iter().map(button).collect();
    vec![CreateActionRow::Buttons(buttons)]
}

/// Save `category` as the answer of `user` and return the reply for them.
pub async fn record_response(
    store: &ResponseStore,
    user: UserId,
    category: Category,
) -> Result<&'static str, StorageError> {
    store.ensure_initialized().await?;
    match store.record(user, category).await? {
        Some(previous) if previous != category => {
            tracing::info!(%user, %category, %previous, "Changed daily task response.")
        }
        _ => tracing::info!(%user, %category, "Recorded daily task response."),
    }
    Ok(acknowledgement(category))
}

/// Handle a button press. Presses on buttons that aren't ours are ignored.
#[instrument(skip_all, fields(user = %component.user.name, custom_id = %component.data.custom_id))]
pub async fn handle_component(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    store: &ResponseStore,
) -> Result<(), BotError> {
    let Some(category) = parse_custom_id(&component.data.custom_id) else {
        tracing::debug!("Ignoring unknown component.");
        return Ok(());
    };

    let reply = match record_response(store, component.user.id, category).await {
        Ok(ack) => ack,
        Err(e) => {
            tracing::error!("Failed to record response: {e}");
            FAILURE_REPLY
        }
    };

    let message = CreateInteractionResponseMessage::new()
        .content(reply)
        .ephemeral(true);
    component
        .create_response(ctx, CreateInteractionResponse::Message(message))
        .await?;
    Ok(())
}
