//! Everything needed before the bot connects.

mod config;
mod framework;

use std::sync::Arc;

use crate::data::ResponseStore;
use crate::lib::catalog::TaskCatalog;
use crate::serenity;
use crate::BotError;

pub use config::Config;
pub use config::Schedule;

/// Constructs a [serenity::Client] with the response files and task catalog loaded.
pub(super) async fn client(config: Config) -> Result<serenity::Client, BotError> {
    // Fail before touching the disk if the bot can't log in anyway.
    let token = config.token()?.to_string();
    let schedule = config.schedule()?;

    let store = ResponseStore::open(config.responses_dir()).await?;
    let catalog = TaskCatalog::load(config.tasks_file(), config.assets_dir()).await?;
    tracing::info!("Resuming with {} responses.", store.participants().await.len());

    // Intents we wish to use
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    // Members are needed for the summary, message content for prefix commands.
    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let resources = framework::Resources {
        config,
        store,
        catalog: Arc::new(catalog),
        schedule,
    };

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(resources))
        .await?;

    Ok(client)
}
