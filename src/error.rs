//! Error types used throughout the bot.
//!
//! [BotError] is the error type handed to [poise]. Everything else converts into it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// Every error the bot can run into.
#[derive(Debug, Error)]
pub enum BotError {
    /// Errors caused by how a user invoked a command. These are shown to the user.
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("A command check failed. Reason: {reason:?}")]
    CheckFailed { reason: Option<String> },

    #[error("Command panicked. Payload: {payload:?}")]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },

    #[error("Scheduled job '{job}' panicked.")]
    JobPanic { job: String },
}

/// Errors that are the user's fault (or just bad luck), replied to ephemerally.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("This command needs a subcommand: {subcmds}")]
    MissingSubcommand { subcmds: String },

    #[error("Couldn't understand the arguments: {input:?}")]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {} seconds.", remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },

    #[error("I'm missing these permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },

    #[error("You're missing these permissions: {missing_permissions:?}")]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },

    #[error("Only the bot owner can use this command.")]
    NotOwner,

    #[error("This command only works in a server.")]
    GuildOnly,

    #[error("This command only works in direct messages.")]
    DmOnly,

    #[error("This command only works in NSFW channels.")]
    NsfwOnly,
}

/// Problems with the configuration. These stop the bot from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing discord token. Set DISCORD_BOT_TOKEN or `discord_token` in the config file.")]
    MissingToken,

    #[error("Missing setting '{name}', required when scheduling is enabled.")]
    MissingSetting { name: &'static str },

    #[error("Environment variable '{name}' is not a valid id: '{value}'")]
    BadEnvId { name: &'static str, value: String },

    #[error("Invalid time of day '{value}' for '{name}', expected HH:MM.")]
    BadTime { name: &'static str, value: String },

    #[error("Config file error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures reading or writing the response files.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures selecting a task or an image.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("There are no tasks to pick from.")]
    EmptyCatalog,

    #[error("There are no images to pick from.")]
    NoAssets,

    #[error("Could not read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures talking to discord outside of a command context.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to deliver message: {0}")]
    Delivery(#[source] serenity::Error),

    #[error("Could not attach '{}': {source}", path.display())]
    Attachment {
        path: PathBuf,
        source: serenity::Error,
    },

    #[error("Failed to fetch guild members: {0}")]
    Roster(#[source] serenity::Error),

    #[error("Could not resolve user {0}.")]
    UnknownUser(serenity::UserId),

    #[error("Connection check failed: {0}")]
    Heartbeat(#[source] serenity::Error),
}
