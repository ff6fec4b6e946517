//! Automation engine: the single entry point used by the outer surfaces.
//!
//! Wraps the [`Scheduler`] and its [`CommandExecutor`] and speaks in the
//! loose terms callers use: action names, `"HH:MM"` strings and textual
//! job ids. Parsing and validation happen here, before any I/O.

use std::sync::Arc;

use gridcharge_domain::error::{GridChargeError, NotFoundError};
use gridcharge_domain::id::JobId;
use gridcharge_domain::job::{ActionKind, Command, Job, TimeOfDay};
use gridcharge_domain::profile::DeviceProfile;

use crate::command_executor::{CommandExecutor, CommandOutcome};
use crate::ports::{DeviceConnector, JobStore};
use crate::scheduler::{Scheduler, SchedulerOptions};

/// Result of a manual command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    /// Always `"success"`; failures under the fail-fast policy are errors.
    pub status: &'static str,
    pub message: String,
    pub outcome: CommandOutcome,
}

/// One line of the schedule listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub id: JobId,
    pub name: String,
    /// Zero-padded `HH:MM`.
    pub time: String,
}

impl From<&Job> for ScheduleEntry {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            time: job.trigger.to_string(),
        }
    }
}

/// Facade over the scheduler and the command executor.
pub struct AutomationEngine<S, C> {
    executor: Arc<CommandExecutor<C>>,
    scheduler: Scheduler<S, C>,
}

impl<S, C> AutomationEngine<S, C>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    /// Build an engine around `executor`, persisting jobs in `store`.
    pub fn new(store: S, executor: CommandExecutor<C>, options: SchedulerOptions) -> Self {
        let executor = Arc::new(executor);
        let scheduler = Scheduler::new(store, Arc::clone(&executor), options);
        Self {
            executor,
            scheduler,
        }
    }

    /// Re-arm persisted jobs and start firing them.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the jobs cannot be loaded.
    pub async fn start(&self) -> Result<(), GridChargeError> {
        self.scheduler.start().await
    }

    /// Stop firing jobs.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// The active device profile.
    pub fn profile(&self) -> &DeviceProfile {
        self.executor.profile()
    }

    /// The underlying scheduler.
    pub fn scheduler(&self) -> &Scheduler<S, C> {
        &self.scheduler
    }

    /// Run `action` right away.
    ///
    /// `power_kw` is only used by actions that take a power. Any finite
    /// value is sent; values outside the profile's nominal range are logged.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown actions or non-finite power,
    /// and a device error when the executor runs fail-fast.
    #[tracing::instrument(skip(self))]
    pub async fn manual_command(
        &self,
        action: &str,
        power_kw: f64,
    ) -> Result<CommandReport, GridChargeError> {
        let action: ActionKind = action.parse()?;
        let command = Command::new(action, power_kw);
        let outcome = self.executor.execute(command).await?;
        Ok(CommandReport {
            status: "success",
            message: command.describe(),
            outcome,
        })
    }

    /// Schedule `action` every day at `time`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed time, an unknown action or
    /// an unusable power value, and a storage error if persisting fails.
    #[tracing::instrument(skip(self))]
    pub async fn schedule_add(
        &self,
        time: &str,
        action: &str,
        power_kw: f64,
    ) -> Result<Job, GridChargeError> {
        let trigger: TimeOfDay = time.parse()?;
        let action: ActionKind = action.parse()?;
        self.scheduler.add_job(trigger, action, power_kw).await
    }

    /// Every scheduled job, ordered by time of day.
    pub async fn schedule_list(&self) -> Vec<ScheduleEntry> {
        self.scheduler
            .list_jobs()
            .await
            .iter()
            .map(ScheduleEntry::from)
            .collect()
    }

    /// Remove the job with the textual id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GridChargeError::NotFound`] when `id` is not a known job id,
    /// including ids that do not parse.
    #[tracing::instrument(skip(self))]
    pub async fn schedule_remove(&self, id: &str) -> Result<(), GridChargeError> {
        let parsed: JobId = id.parse().map_err(|_| NotFoundError {
            entity: "Job",
            id: id.to_string(),
        })?;
        self.scheduler.remove_job(parsed).await
    }

    /// Current battery state of charge in percent.
    ///
    /// # Errors
    ///
    /// Returns a device error when the inverter cannot be read.
    pub async fn current_soc(&self) -> Result<f64, GridChargeError> {
        self.executor.read_battery_percentage().await
    }
}
