//! A tiny wall-clock job scheduler.
//!
//! Each [Job] cycles through [JobState]: it is armed with its next trigger
//! instant, fires once that instant has passed, then goes idle and is re-armed.
//! Time only moves through [Scheduler::tick], so tests can drive it with
//! made-up instants instead of sleeping.

use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::TimeDelta;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::BotError;

/// What a job does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    PostTask,
    PostSummary,
    Liveness,
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobKind::PostTask => "post-task",
            JobKind::PostSummary => "post-summary",
            JobKind::Liveness => "liveness",
        };
        f.write_str(name)
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every day at this (local) time.
    Daily(NaiveTime),
    /// Repeatedly, this long after the job was last armed.
    Every(TimeDelta),
}

impl Trigger {
    /// The first trigger instant strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Trigger::Daily(at) => {
                let today = now.date().and_time(at);
                if today > now {
                    today
                } else {
                    today + TimeDelta::days(1)
                }
            }
            Trigger::Every(interval) => now + interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Armed { at: NaiveDateTime },
    Firing,
}

#[derive(Debug, Clone)]
pub struct Job {
    kind: JobKind,
    trigger: Trigger,
    state: JobState,
}

impl Job {
    pub fn new(kind: JobKind, trigger: Trigger) -> Self {
        Self {
            kind,
            trigger,
            state: JobState::Idle,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Arm an idle job. Returns `false` (and changes nothing) if it was already armed or firing.
    pub fn arm(&mut self, now: NaiveDateTime) -> bool {
        match self.state {
            JobState::Idle => {
                self.state = JobState::Armed {
                    at: self.trigger.next_after(now),
                };
                true
            }
            JobState::Armed { .. } | JobState::Firing => false,
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        matches!(self.state, JobState::Armed { at } if now >= at)
    }

    /// Armed -> Firing.
    fn begin(&mut self) {
        self.state = JobState::Firing;
    }

    /// Firing -> Idle -> Armed for the next cycle.
    fn finish(&mut self, now: NaiveDateTime) {
        self.state = JobState::Idle;
        self.arm(now);
    }
}

/// Runs the jobs when they fire.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, kind: JobKind) -> Result<(), BotError>;
}

/// Owns the jobs and drives them with a [JobHandler].
pub struct Scheduler<H> {
    handler: H,
    jobs: Mutex<Vec<Job>>,
    /// How often the clock is checked when running.
    period: Duration,
    started: AtomicBool,
}

impl<H> std::fmt::Debug for Scheduler<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("period", &self.period)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl<H: JobHandler + 'static> Scheduler<H> {
    pub fn new(handler: H, jobs: Vec<Job>, period: Duration) -> Self {
        Self {
            handler,
            jobs: Mutex::new(jobs),
            period,
            started: AtomicBool::new(false),
        }
    }

    /// Arm every idle job. Already armed jobs keep their instant.
    pub async fn arm_all(&self, now: NaiveDateTime) {
        let mut jobs = self.jobs.lock().await;
        for job in jobs.iter_mut() {
            if job.arm(now) {
                tracing::debug!("Armed {} job for {:?}.", job.kind, job.state);
            }
        }
    }

    /// Fire every job due at `now`, one after the other, and re-arm them.
    /// Failing jobs are logged and otherwise treated like successful ones.
    /// Returns the jobs that fired.
    pub async fn tick(&self, now: NaiveDateTime) -> Vec<JobKind> {
        let due: Vec<JobKind> = {
            let mut jobs = self.jobs.lock().await;
            jobs.iter_mut()
                .filter(|job| job.is_due(now))
                .map(|job| {
                    job.begin();
                    job.kind
                })
                .collect()
        };

        for &kind in &due {
            tracing::info!("Running {kind} job.");
            let outcome = AssertUnwindSafe(self.handler.run(kind))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(BotError::JobPanic {
                        job: kind.to_string(),
                    })
                });
            if let Err(e) = outcome {
                tracing::error!("The {kind} job failed: {e}");
            }
        }

        let mut jobs = self.jobs.lock().await;
        for job in jobs.iter_mut().filter(|job| due.contains(&job.kind)) {
            job.finish(now);
        }
        due
    }

    /// Current state of every job.
    pub async fn states(&self) -> Vec<(JobKind, JobState)> {
        let jobs = self.jobs.lock().await;
        jobs.iter().map(|job| (job.kind, job.state())).collect()
    }

    /// Start ticking on the local clock in the background.
    /// Returns `false` if the scheduler was already started.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Scheduler already running.");
            return false;
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.arm_all(local_now()).await;
            let mut interval = tokio::time::interval(scheduler.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                scheduler.tick(local_now()).await;
            }
        });
        tracing::info!("Scheduler started.");
        true
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn time(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    /// Remembers which jobs ran, optionally failing or panicking on one kind.
    #[derive(Default)]
    struct Recorder {
        ran: StdMutex<Vec<JobKind>>,
        fail: Option<JobKind>,
        panic: Option<JobKind>,
    }

    #[async_trait]
    impl JobHandler for Recorder {
        async fn run(&self, kind: JobKind) -> Result<(), BotError> {
            self.ran.lock().unwrap().push(kind);
            if self.panic == Some(kind) {
                panic!("job exploded");
            }
            if self.fail == Some(kind) {
                return Err(BotError::CheckFailed { reason: None });
            }
            Ok(())
        }
    }

    fn daily_jobs() -> Vec<Job> {
        vec![
            Job::new(JobKind::PostSummary, Trigger::Daily(time(8, 55))),
            Job::new(JobKind::PostTask, Trigger::Daily(time(9, 0))),
        ]
    }

    #[test]
    fn daily_trigger_picks_next_occurrence() {
        let trigger = Trigger::Daily(time(9, 0));

        assert_eq!(trigger.next_after(at(1, 8, 0)), at(1, 9, 0));
        assert_eq!(trigger.next_after(at(1, 9, 0)), at(2, 9, 0));
        assert_eq!(trigger.next_after(at(1, 23, 0)), at(2, 9, 0));
    }

    #[test]
    fn arming_twice_is_a_noop() {
        let mut job = Job::new(JobKind::PostTask, Trigger::Daily(time(9, 0)));

        assert!(job.arm(at(1, 8, 0)));
        assert!(!job.arm(at(1, 10, 0)));
        assert_eq!(job.state(), JobState::Armed { at: at(1, 9, 0) });
    }

    #[tokio::test]
    async fn daily_jobs_fire_once_per_day() {
        let scheduler = Scheduler::new(Recorder::default(), daily_jobs(), Duration::from_secs(1));
        scheduler.arm_all(at(1, 8, 0)).await;

        assert!(scheduler.tick(at(1, 8, 30)).await.is_empty());
        assert_eq!(scheduler.tick(at(1, 8, 55)).await, vec![JobKind::PostSummary]);
        assert!(scheduler.tick(at(1, 8, 56)).await.is_empty());
        assert_eq!(scheduler.tick(at(1, 9, 0)).await, vec![JobKind::PostTask]);
        assert!(scheduler.tick(at(1, 12, 0)).await.is_empty());
        assert_eq!(
            scheduler.tick(at(2, 9, 5)).await,
            vec![JobKind::PostSummary, JobKind::PostTask]
        );

        let ran = scheduler.handler.ran.lock().unwrap().clone();
        assert_eq!(
            ran,
            vec![
                JobKind::PostSummary,
                JobKind::PostTask,
                JobKind::PostSummary,
                JobKind::PostTask
            ]
        );
    }

    #[tokio::test]
    async fn interval_job_repeats() {
        let jobs = vec![Job::new(
            JobKind::Liveness,
            Trigger::Every(TimeDelta::minutes(5)),
        )];
        let scheduler = Scheduler::new(Recorder::default(), jobs, Duration::from_secs(1));
        scheduler.arm_all(at(1, 0, 0)).await;

        assert!(scheduler.tick(at(1, 0, 4)).await.is_empty());
        assert_eq!(scheduler.tick(at(1, 0, 5)).await, vec![JobKind::Liveness]);
        assert!(scheduler.tick(at(1, 0, 9)).await.is_empty());
        assert_eq!(scheduler.tick(at(1, 0, 10)).await, vec![JobKind::Liveness]);
    }

    #[tokio::test]
    async fn failing_job_is_rearmed() {
        let recorder = Recorder {
            fail: Some(JobKind::PostTask),
            ..Default::default()
        };
        let scheduler = Scheduler::new(recorder, daily_jobs(), Duration::from_secs(1));
        scheduler.arm_all(at(1, 8, 0)).await;

        assert_eq!(scheduler.tick(at(1, 9, 0)).await.len(), 2);
        // No retry within the same cycle.
        assert!(scheduler.tick(at(1, 9, 1)).await.is_empty());

        let states = scheduler.states().await;
        assert!(states.contains(&(JobKind::PostTask, JobState::Armed { at: at(2, 9, 0) })));
    }

    #[tokio::test]
    async fn panicking_job_does_not_stop_others() {
        let recorder = Recorder {
            panic: Some(JobKind::PostSummary),
            ..Default::default()
        };
        let scheduler = Scheduler::new(recorder, daily_jobs(), Duration::from_secs(1));
        scheduler.arm_all(at(1, 8, 0)).await;

        let fired = scheduler.tick(at(1, 9, 0)).await;

        assert_eq!(fired, vec![JobKind::PostSummary, JobKind::PostTask]);
        assert_eq!(scheduler.handler.ran.lock().unwrap().len(), 2);
        for (_, state) in scheduler.states().await {
            assert!(matches!(state, JobState::Armed { .. }));
        }
    }

    #[tokio::test]
    async fn arm_all_keeps_existing_instants() {
        let scheduler = Scheduler::new(Recorder::default(), daily_jobs(), Duration::from_secs(1));
        scheduler.arm_all(at(1, 8, 0)).await;
        scheduler.arm_all(at(1, 23, 0)).await;

        let states = scheduler.states().await;
        assert!(states.contains(&(JobKind::PostTask, JobState::Armed { at: at(1, 9, 0) })));
    }

    #[tokio::test]
    async fn start_twice_is_a_noop() {
        let scheduler = Arc::new(Scheduler::new(
            Recorder::default(),
            Vec::new(),
            Duration::from_secs(60),
        ));

        assert!(scheduler.start());
        assert!(!scheduler.start());
    }
}
