//! Setup for [poise::Framework]

use std::sync::Arc;

use crate::commands;
use crate::data::ResponseStore;
use crate::lib::catalog::TaskCatalog;
use crate::lib::gateway::SerenityGateway;
use crate::lib::jobs;
use crate::lib::jobs::DailyJobs;
use crate::lib::scheduler::Scheduler;
use crate::serenity;
use crate::setup::Schedule;
use crate::BotError;
use crate::Config;
use crate::Data;

/// Convenient type alias, only this [poise::Framework] type is used.
type Framework = poise::Framework<Data, BotError>;

/// Everything loaded before connecting, handed to [Data] on startup.
pub(super) struct Resources {
    pub config: Config,
    pub store: ResponseStore,
    pub catalog: Arc<TaskCatalog>,
    pub schedule: Option<Schedule>,
}

/// Construct a [poise::Framework]
pub(super) fn framework(resources: Resources) -> Framework {
    poise::Framework::builder()
        .options(framework_options())
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, resources))
        .build()
}

/// Configure options for the [Framework]
fn framework_options() -> poise::FrameworkOptions<Data, BotError> {
    poise::FrameworkOptions {
        // Add commands to the framework
        commands: commands::list(),
        // `!test` and friends
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("!".into()),
            ..Default::default()
        },
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Button presses and reconnects
        event_handler: |ctx, event, fw, data| {
            Box::pin(crate::lib::events::handle_event(ctx, event, fw, data))
        },
        // Log when commands start
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author().name;
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        // Log when finishing commands
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author().name;
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Construct future that runs on startup
fn framework_setup<'a>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework,
    resources: Resources,
) -> poise::BoxFuture<'a, Result<Data, BotError>> {
    Box::pin(async move {
        let Resources {
            config,
            store,
            catalog,
            schedule,
        } = resources;

        // Register the commands
        let commands = &fw.options().commands;
        let app_commands = poise::builtins::create_application_commands(commands);

        serenity::Command::set_global_commands(ctx, app_commands.clone()).await?;
        if let Some(dev_guild) = config.dev_guild() {
            // This is faster than global registers, useful for development.
            tracing::info!("Registering commands on dev guild.");
            dev_guild.set_commands(ctx, app_commands).await?;
        }
        tracing::info!("Registered {} commands.", commands.len());

        let scheduler = schedule.map(|schedule| {
            let gateway = SerenityGateway::new(ctx.http.clone(), schedule.guild, schedule.channel);
            let handler = DailyJobs::new(gateway, store.clone(), catalog.clone(), Some(schedule.role));
            let jobs = jobs::daily_jobs(schedule.task_at, schedule.summary_at, schedule.liveness);
            Arc::new(Scheduler::new(handler, jobs, schedule.tick))
        });
        match &scheduler {
            Some(scheduler) => {
                scheduler.start();
            }
            None => tracing::info!("Scheduling is disabled."),
        }

        // Simple message that logs when the bot has initialized
        let bot_name = &rdy.user.name;
        tracing::info!("{bot_name} is ready!");

        Ok(Data {
            notify_list: config.notify_list(fw),
            store,
            catalog,
            scheduler,
        })
    })
}
