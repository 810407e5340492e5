use poise::serenity_prelude as serenity;

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod setup;

pub use data::Data;
pub use error::BotError;
pub use setup::Config;

/// Convenient type alias for [poise::Context].
type Context<'a> = poise::Context<'a, Data, BotError>;

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // A missing .env is fine, the variables may come from the environment.
    let _ = dotenvy::dotenv();

    let config = Config::read()?;

    // Keep the guard alive so file logs are flushed on exit.
    let _log_guard = log::install_tracing(&config);

    let mut client = setup::client(config).await?;
    if let Err(e) = client.start().await {
        tracing::error!("Client stopped: {e}");
        return Err(e.into());
    }

    Ok(())
}
