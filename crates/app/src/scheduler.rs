//! Scheduler: arms persisted jobs and fires them once per day.
//!
//! Jobs live in the [`JobStore`] and, while armed, in an in-memory table.
//! A single timer task wakes at every wall-clock minute boundary and fires
//! the jobs whose trigger matches. Minutes missed because the process was
//! busy or suspended are caught up within a grace window; anything older
//! is skipped with a warning. If the clock moves backwards nothing fires
//! until it passes the last fired minute again.
//!
//! Every fired job runs in its own task, so a slow or failing job never
//! delays the others or the next tick.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use gridcharge_domain::error::{GridChargeError, NotFoundError};
use gridcharge_domain::id::JobId;
use gridcharge_domain::job::{ActionKind, Job, TimeOfDay};
use gridcharge_domain::time::{local_now, truncate_to_minute};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};

use crate::command_executor::CommandExecutor;
use crate::ports::{DeviceConnector, JobStore};

/// Tuning knobs for the [`Scheduler`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// How many minutes late a tick may still fire its jobs.
    pub misfire_grace_minutes: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            misfire_grace_minutes: 5,
        }
    }
}

struct Inner<S, C> {
    store: S,
    executor: Arc<CommandExecutor<C>>,
    armed: Mutex<HashMap<JobId, Job>>,
    timer: std::sync::Mutex<Option<JoinHandle<()>>>,
    options: SchedulerOptions,
}

/// Daily job scheduler. Cheap to clone; clones share the same job table.
pub struct Scheduler<S, C> {
    inner: Arc<Inner<S, C>>,
}

impl<S, C> Clone for Scheduler<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C> Scheduler<S, C>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    /// Create a scheduler. Nothing is armed until [`load`](Self::load) or
    /// [`start`](Self::start) is called.
    pub fn new(store: S, executor: Arc<CommandExecutor<C>>, options: SchedulerOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                executor,
                armed: Mutex::new(HashMap::new()),
                timer: std::sync::Mutex::new(None),
                options,
            }),
        }
    }

    /// The executor jobs are run with.
    pub fn executor(&self) -> &Arc<CommandExecutor<C>> {
        &self.inner.executor
    }

    /// Replace the armed table with the jobs currently in the store.
    ///
    /// Stored jobs that fail validation are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, GridChargeError> {
        let mut armed = self.inner.armed.lock().await;
        let jobs = self.inner.store.list().await?;
        armed.clear();
        for job in jobs {
            if let Err(err) = job.validate() {
                tracing::warn!(job_id = %job.id, error = %err, "skipping invalid stored job");
                continue;
            }
            armed.insert(job.id, job);
        }
        tracing::info!(count = armed.len(), "jobs armed from store");
        Ok(armed.len())
    }

    /// Load the persisted jobs and start the timer task.
    ///
    /// Calling `start` on a running scheduler only reloads the jobs.
    /// The current minute is never fired by `start` itself.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    pub async fn start(&self) -> Result<(), GridChargeError> {
        self.load().await?;
        let mut timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        *timer = Some(tokio::spawn(run_timer(inner)));
        tracing::info!("scheduler started");
        Ok(())
    }

    /// Stop the timer task. Jobs already firing run to completion.
    pub fn shutdown(&self) {
        let handle = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("scheduler stopped");
        }
    }

    /// Whether the timer task is alive.
    pub fn is_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Persist a new job and arm it.
    ///
    /// The job is only armed once the store accepted it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unusable power values, or a storage
    /// error if the job could not be persisted.
    #[tracing::instrument(skip(self))]
    pub async fn add_job(
        &self,
        trigger: TimeOfDay,
        action: ActionKind,
        power_kw: f64,
    ) -> Result<Job, GridChargeError> {
        let job = Job::new(trigger, action, power_kw)?;
        let mut armed = self.inner.armed.lock().await;
        self.inner.store.put(job.clone()).await?;
        armed.insert(job.id, job.clone());
        tracing::info!(job_id = %job.id, name = %job.name, at = %job.trigger, "job scheduled");
        Ok(job)
    }

    /// Disarm a job and delete it from the store.
    ///
    /// # Errors
    ///
    /// Returns [`GridChargeError::NotFound`] if no job with `id` is armed,
    /// or a storage error if the deletion fails.
    #[tracing::instrument(skip(self))]
    pub async fn remove_job(&self, id: JobId) -> Result<(), GridChargeError> {
        let mut armed = self.inner.armed.lock().await;
        if !armed.contains_key(&id) {
            return Err(NotFoundError {
                entity: "Job",
                id: id.to_string(),
            }
            .into());
        }
        self.inner.store.delete(id).await?;
        armed.remove(&id);
        tracing::info!(job_id = %id, "job removed");
        Ok(())
    }

    /// Armed jobs ordered by trigger time, ties broken by id.
    pub async fn list_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.inner.armed.lock().await.values().cloned().collect();
        jobs.sort_by_key(|job| (job.trigger, job.id));
        jobs
    }

    /// Fire every armed job whose trigger matches `at` and wait for all of
    /// them to finish. Jobs removed in the meantime are left out. Returns
    /// how many jobs were fired.
    pub async fn fire_due(&self, at: NaiveTime) -> usize {
        Arc::clone(&self.inner).fire_due(at).await
    }
}

impl<S, C> Inner<S, C>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    async fn fire_due(self: Arc<Self>, at: NaiveTime) -> usize {
        let due: Vec<Job> = self
            .armed
            .lock()
            .await
            .values()
            .filter(|job| job.trigger.matches(at))
            .cloned()
            .collect();

        let mut tasks = JoinSet::new();
        for job in due {
            let inner = Arc::clone(&self);
            tasks.spawn(async move {
                if !inner.armed.lock().await.contains_key(&job.id) {
                    return (job, None);
                }
                tracing::info!(job_id = %job.id, name = %job.name, "firing job");
                let result = inner.executor.execute(job.command()).await;
                (job, Some(result))
            });
        }

        let mut fired = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((job, None)) => {
                    tracing::debug!(job_id = %job.id, "job removed before it fired");
                }
                Ok((job, Some(Ok(outcome)))) if outcome.all_succeeded() => {
                    fired += 1;
                    tracing::info!(job_id = %job.id, name = %job.name, "job completed");
                }
                Ok((job, Some(Ok(outcome)))) => {
                    fired += 1;
                    tracing::warn!(
                        job_id = %job.id,
                        name = %job.name,
                        failed_writes = outcome.failures().count(),
                        "job completed with failed writes"
                    );
                }
                Ok((job, Some(Err(err)))) => {
                    fired += 1;
                    tracing::error!(job_id = %job.id, name = %job.name, error = %err, "job failed");
                }
                Err(err) => {
                    tracing::error!(error = %err, "job task aborted");
                }
            }
        }
        fired
    }
}

/// What the timer does when it wakes up.
#[derive(Debug, PartialEq, Eq)]
struct Tick {
    /// Minutes to fire, oldest first.
    due: Vec<NaiveDateTime>,
    /// Missed minutes dropped because they fall outside the grace window.
    skipped: i64,
    /// Last handled minute to carry into the next wake-up.
    last: NaiveDateTime,
    /// The wall clock is behind `last`.
    rewound: bool,
}

/// Decide which minutes to fire when waking at `now`, `last` being the most
/// recent minute already handled (the start minute on the first wake-up).
fn next_tick(last: NaiveDateTime, now: NaiveDateTime, grace_minutes: u32) -> Tick {
    let now = truncate_to_minute(now);
    if now < last {
        return Tick {
            due: Vec::new(),
            skipped: 0,
            last,
            rewound: true,
        };
    }
    let (due, skipped) = pending_minutes(last, now, grace_minutes);
    Tick {
        due,
        skipped,
        last: now,
        rewound: false,
    }
}

async fn run_timer<S, C>(inner: Arc<Inner<S, C>>)
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    let grace = inner.options.misfire_grace_minutes;
    let mut last = truncate_to_minute(local_now());
    loop {
        tokio::time::sleep(until_next_minute(local_now())).await;

        let now = local_now();
        let tick = next_tick(last, now, grace);
        if tick.rewound {
            tracing::warn!(%last, %now, "wall clock moved backwards, waiting to catch up");
        }
        if tick.skipped > 0 {
            tracing::warn!(
                skipped = tick.skipped,
                grace_minutes = grace,
                "ticks missed beyond the grace window, skipping"
            );
        }
        for minute in tick.due {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move {
                inner.fire_due(minute.time()).await;
            });
        }
        last = tick.last;
    }
}

/// Time to sleep until just past the next minute boundary.
fn until_next_minute(now: NaiveDateTime) -> Duration {
    let elapsed = TimeDelta::seconds(i64::from(now.second()))
        + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    let remaining = TimeDelta::minutes(1) - elapsed;
    remaining.to_std().unwrap_or_default() + Duration::from_millis(50)
}

/// Minutes in `(last, now]` still worth firing, and how many older ones are
/// skipped because they fall outside the grace window.
fn pending_minutes(
    last: NaiveDateTime,
    now: NaiveDateTime,
    grace_minutes: u32,
) -> (Vec<NaiveDateTime>, i64) {
    let missed = (now - last).num_minutes();
    if missed <= 0 {
        return (Vec::new(), 0);
    }
    let kept = missed.min(i64::from(grace_minutes) + 1);
    let due = (0..kept)
        .rev()
        .map(|back| now - TimeDelta::minutes(back))
        .collect();
    (due, missed - kept)
}
