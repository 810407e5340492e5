//! Bot commands.

mod hello;
mod ping;
mod summary;
mod task;
mod test;

use crate::BotError;
use crate::Data;

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, BotError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        hello::hello(),
        ping::ping(),
        test::test_command(),
        task::task(),
        summary::summary(),
    ]
}
