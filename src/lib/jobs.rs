//! The scheduled daily jobs: posting the task, posting the summary and checking the connection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;
use chrono::TimeDelta;
use serenity::Mentionable;
use serenity::RoleId;
use tracing::instrument;

use super::catalog::TaskCatalog;
use super::gateway::Gateway;
use super::gateway::Post;
use super::gateway::SerenityGateway;
use super::scheduler::Job;
use super::scheduler::JobHandler;
use super::scheduler::JobKind;
use super::scheduler::Scheduler;
use super::scheduler::Trigger;
use super::summary::SummaryReport;
use crate::data::ResponseStore;
use crate::serenity;
use crate::BotError;

/// The scheduler the bot actually runs.
pub type DailyScheduler = Scheduler<DailyJobs<SerenityGateway>>;

/// Text of a task post.
pub fn task_message(task: &str, role: Option<RoleId>) -> String {
    let ping = role.map(|r| format!("{} ", r.mention())).unwrap_or_default();
    format!("{ping}📝 **Today's Task**\n\n{task}\n\nLet us know how it went with the buttons below!")
}

/// The three jobs of a day: summary at `summary_at`, task at `task_at`, liveness every `liveness`.
pub fn daily_jobs(task_at: NaiveTime, summary_at: NaiveTime, liveness: TimeDelta) -> Vec<Job> {
    vec![
        Job::new(JobKind::PostSummary, Trigger::Daily(summary_at)),
        Job::new(JobKind::PostTask, Trigger::Daily(task_at)),
        Job::new(JobKind::Liveness, Trigger::Every(liveness)),
    ]
}

/// Runs the daily jobs against a [Gateway].
pub struct DailyJobs<G> {
    gateway: G,
    store: ResponseStore,
    catalog: Arc<TaskCatalog>,
    /// Role pinged by task posts.
    role: Option<RoleId>,
}

impl<G: Gateway> DailyJobs<G> {
    pub fn new(
        gateway: G,
        store: ResponseStore,
        catalog: Arc<TaskCatalog>,
        role: Option<RoleId>,
    ) -> Self {
        Self {
            gateway,
            store,
            catalog,
            role,
        }
    }

    /// Post a random task with an image and the response buttons.
    /// An empty catalog skips the post.
    #[instrument(skip(self))]
    pub async fn post_task(&self) -> Result<(), BotError> {
        let picked = self
            .catalog
            .pick_task()
            .and_then(|task| Ok((task, self.catalog.pick_asset()?)));
        let (task, asset) = match picked {
            Ok(picked) => picked,
            Err(e) => {
                tracing::warn!("Skipping today's task: {e}");
                return Ok(());
            }
        };

        let post = Post::builder()
            .content(task_message(task, self.role))
            .asset(asset.to_path_buf())
            .with_collector(true)
            .build();
        self.gateway.broadcast(post).await?;
        tracing::info!("Posted today's task: {task}");
        Ok(())
    }

    /// Post the summary of the cycle, then start a new one.
    /// If anything fails before the summary is delivered, the responses are kept.
    ///
    /// The report is built from a snapshot taken before any names are looked up.
    /// Answers given after the snapshot, up to the reset, are cleared without being reported.
    #[instrument(skip(self))]
    pub async fn post_summary(&self) -> Result<(), BotError> {
        let roster = self.gateway.members().await?;
        let tally = self.store.snapshot().await;
        let report = SummaryReport::build(&roster, &tally, &self.gateway).await;

        let post = Post::builder().content(report.render()).build();
        self.gateway.broadcast(post).await?;
        tracing::info!(
            completed = report.completed.len(),
            attempted = report.attempted_count,
            skipped = report.skipped_count,
            absent = report.not_participated_count,
            "Posted summary."
        );

        self.store.reset().await?;
        Ok(())
    }

    /// Log whether discord is still reachable.
    pub async fn liveness(&self) -> Result<(), BotError> {
        let name = self.gateway.heartbeat().await?;
        tracing::info!("Still connected as {name}.");
        Ok(())
    }
}

#[async_trait]
impl<G: Gateway + 'static> JobHandler for DailyJobs<G> {
    async fn run(&self, kind: JobKind) -> Result<(), BotError> {
        match kind {
            JobKind::PostTask => self.post_task().await,
            JobKind::PostSummary => self.post_summary().await,
            JobKind::Liveness => self.liveness().await,
        }
    }
}
