//! Configuration for running this bot.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::path::Path;
use std::path::PathBuf;

use chrono::NaiveTime;
use chrono::TimeDelta;
use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::ChannelId;
use serenity::GuildId;
use serenity::RoleId;
use serenity::UserId;

use crate::error::ConfigError;
use crate::serenity;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Environment variable holding the discord token.
const TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
/// Discord settings can be overridden by environment variables.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    discord_token: String,

    /// See [DiscordConfig]
    discord: DiscordConfig,

    /// See [ScheduleConfig]
    schedule: ScheduleConfig,

    /// See [StorageConfig]
    storage: StorageConfig,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,
}

/// Validated settings for the daily jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub role: RoleId,
    pub task_at: NaiveTime,
    pub summary_at: NaiveTime,
    pub liveness: TimeDelta,
    pub tick: std::time::Duration,
}

impl Config {
    /// Reads [CONFIG_PATH] and applies environment overrides.
    pub fn read() -> Result<Config, ConfigError> {
        let mut config = Config::read_from(CONFIG_PATH)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Tries to read `path` to extract a [Config].
    /// If the file doesn't exist, create the default config file and use the defaults.
    /// If the file exists but is empty, re-write the default values and use them.
    /// If the file exists but is incomplete, show error and don't change files.
    /// If file existence is indeterminate (e.g. missing permissions), return error.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => {
                eprintln!("Empty config file! Rewriting {} ...", path.display());
                write_file(path, &Config::default())?;
                Ok(Config::default())
            }
            Ok(content) => Config::from_toml(&content),
            Err(file_error) if file_error.kind() == std::io::ErrorKind::NotFound => {
                eprintln!("No config file found. Creating {} ...", path.display());
                write_file(path, &Config::default())?;
                Ok(Config::default())
            }
            Err(file_error) => Err(ConfigError::IoError(file_error)),
        }
    }

    /// Parse a config, describing exactly where it went wrong if it fails.
    pub fn from_toml(content: &str) -> Result<Config, ConfigError> {
        let to_toml = toml::Deserializer::new(content);
        serde_path_to_error::deserialize(to_toml).map_err(|error| ConfigError::InvalidConfig {
            reason: error.to_string(),
        })
    }

    /// Override discord settings with environment variables, if set.
    /// `lookup` returns the value of a variable.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup(TOKEN_VAR) {
            self.discord_token = token.trim().to_string();
        }
        if let Some(id) = lookup("GUILD_ID") {
            self.discord.guild_id = Some(parse_id("GUILD_ID", &id)?);
        }
        if let Some(id) = lookup("CHANNEL_ID") {
            self.discord.channel_id = Some(parse_id("CHANNEL_ID", &id)?);
        }
        if let Some(id) = lookup("ROLE_ID") {
            self.discord.role_id = Some(parse_id("ROLE_ID", &id)?);
        }
        Ok(())
    }

    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<&str, ConfigError> {
        let default_token = Config::default().discord_token;
        let given_token = self.discord_token.trim();

        let is_empty = given_token.is_empty();
        let contains_default = given_token.contains(&default_token);

        if !is_empty && !contains_default {
            Ok(given_token)
        } else {
            Err(ConfigError::MissingToken)
        }
    }

    /// Settings for the daily jobs, or `None` if scheduling is disabled.
    pub fn schedule(&self) -> Result<Option<Schedule>, ConfigError> {
        let schedule = &self.schedule;
        if !schedule.enabled {
            return Ok(None);
        }

        let discord = &self.discord;
        Ok(Some(Schedule {
            guild: discord.guild_id.ok_or(ConfigError::MissingSetting { name: "guild_id" })?,
            channel: discord
                .channel_id
                .ok_or(ConfigError::MissingSetting { name: "channel_id" })?,
            role: discord.role_id.ok_or(ConfigError::MissingSetting { name: "role_id" })?,
            task_at: parse_time("post_task_at", &schedule.post_task_at)?,
            summary_at: parse_time("post_summary_at", &schedule.post_summary_at)?,
            liveness: TimeDelta::minutes(schedule.liveness_minutes.max(1).into()),
            tick: std::time::Duration::from_secs(schedule.tick_seconds.max(1)),
        }))
    }

    /// Directory holding the response files.
    pub fn responses_dir(&self) -> &Path {
        &self.storage.responses_dir
    }

    /// File with one task per line.
    pub fn tasks_file(&self) -> &Path {
        &self.storage.tasks_file
    }

    /// Directory of images posted with tasks.
    pub fn assets_dir(&self) -> &Path {
        &self.storage.assets_dir
    }

    /// Construct a bug notification notify list based on the config.
    /// Wrapper for [NotifyConfig::notify_list]
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.notify_list(fw)
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: "put_token_here".to_string(),

            discord: DiscordConfig {
                guild_id: None,
                channel_id: None,
                role_id: None,
            },

            schedule: ScheduleConfig {
                enabled: false,
                post_task_at: "09:00".to_string(),
                post_summary_at: "08:55".to_string(),
                liveness_minutes: 5,
                tick_seconds: 20,
            },

            storage: StorageConfig {
                responses_dir: PathBuf::from("responses"),
                tasks_file: PathBuf::from("tasks.txt"),
                assets_dir: PathBuf::from("images"),
            },

            logging: LoggingConfig {
                console_debug: false,
                logs_enabled: true,
                log_dir: "logs".to_string(),
            },

            dev_utils: DevConfig {
                dev_guild: None,
                notifications: NotifyConfig {
                    enabled: false,
                    add_owners: true,
                    userids: vec![],
                },
            },
        }
    }
}

/// Where the bot posts. Empty strings mean "not set".
#[derive(Debug, Serialize, Deserialize)]
struct DiscordConfig {
    /// The guild whose members are counted in summaries.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    guild_id: Option<GuildId>,
    /// The channel tasks and summaries are posted to.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    channel_id: Option<ChannelId>,
    /// The role pinged by task posts.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    role_id: Option<RoleId>,
}

/// When the daily jobs run. Times are local, "HH:MM".
#[derive(Debug, Serialize, Deserialize)]
struct ScheduleConfig {
    /// Post tasks and summaries at all?
    enabled: bool,
    post_task_at: String,
    post_summary_at: String,
    /// Minutes between connection checks.
    liveness_minutes: u32,
    /// Seconds between clock checks.
    tick_seconds: u64,
}

/// Where things are read from and written to.
#[derive(Debug, Serialize, Deserialize)]
struct StorageConfig {
    responses_dir: PathBuf,
    tasks_file: PathBuf,
    assets_dir: PathBuf,
}

/// Configs for logging
#[derive(Debug, Serialize, Deserialize)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Serialize, Deserialize)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    dev_guild: Option<GuildId>,
    /// See [NotifyConfig]
    notifications: NotifyConfig,
}

/// Configs for notification behavior when encountering unexpected errors.
#[derive(Debug, Serialize, Deserialize)]
struct NotifyConfig {
    /// Enable this behavior or not. (bot sends a private message)
    enabled: bool,
    /// Whether to automatically add owners to the notify list.
    add_owners: bool,
    /// Additional users to add to the notify list.
    userids: Vec<UserId>,
}

impl NotifyConfig {
    /// Construct a bug notification notify list based on the config.
    fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        let mut notify_list = HashSet::new();

        // If disabled, don't add anyone to the list.
        if !self.enabled {
            return notify_list;
        }

        if self.add_owners {
            notify_list.extend(fw.options().owners.iter().copied());
        }
        notify_list.extend(self.userids.iter().copied());

        notify_list
    }
}

/// Write the given config to `path`.
fn write_file(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidConfig {
        reason: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(ConfigError::IoError)
}

fn parse_id<T: From<u64>>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(T::from(id)),
        _ => Err(ConfigError::BadEnvId {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_time(name: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::BadTime {
        name,
        value: value.to_string(),
    })
}

fn deserialize_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: From<u64>,
{
    deserializer.deserialize_any(OptVisitor(PhantomData))
}

fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

/// Reads an optional discord id written as a string ("" for none) or an integer.
struct OptVisitor<T>(PhantomData<T>);

impl<'de, T: From<u64>> serde::de::Visitor<'de> for OptVisitor<T> {
    type Value = Option<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a valid discord id")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v.trim() {
            "" => Ok(None),
            s => {
                let num: u64 = s.parse().map_err(|_| E::custom("not u64"))?;
                self.visit_u64(num)
            }
        }
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v {
            0 => Err(E::custom("ids can't be 0")),
            id => Ok(Some(T::from(id))),
        }
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let num = u64::try_from(v).map_err(|_| E::custom("ids can't be negative"))?;
        self.visit_u64(num)
    }
}
