//! Command executor: turns high-level commands into register writes.
//!
//! Every command is a pair of writes performed in a fixed order: the power
//! register first, then the mode register.
//!
//! Each call opens its own connection and closes it on every exit path.
//! What happens when one of the writes fails depends on [`WritePolicy`].

use std::time::Duration;

use gridcharge_domain::error::{DeviceError, GridChargeError, ValidationError};
use gridcharge_domain::job::{Command, format_kw};
use gridcharge_domain::profile::{DeviceProfile, Mode};
use tokio::sync::{Mutex, MutexGuard};

use crate::ports::{DeviceClient, DeviceConnector};

/// Reaction to a failed register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Attempt every write of the command, log failures and report them in
    /// the [`CommandOutcome`]. The call itself succeeds.
    #[default]
    BestEffort,
    /// Stop at the first failed write and return the [`DeviceError`].
    FailFast,
}

/// Tuning knobs for the [`CommandExecutor`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    pub policy: WritePolicy,
    /// How many times a single write is tried before it counts as failed.
    pub write_attempts: u32,
    /// Pause between two attempts of the same write.
    pub retry_delay: Duration,
    /// Hold a single-writer lock for the whole write sequence so manual and
    /// scheduled commands never interleave.
    pub serialize_device_access: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            policy: WritePolicy::BestEffort,
            write_attempts: 1,
            retry_delay: Duration::from_millis(500),
            serialize_device_access: true,
        }
    }
}

/// Result of one register write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub register: u16,
    pub value: u16,
    /// `None` when the write was acknowledged by the device.
    pub error: Option<String>,
}

impl WriteOutcome {
    fn written(register: u16, value: u16) -> Self {
        Self {
            register,
            value,
            error: None,
        }
    }

    fn failed(register: u16, value: u16, err: &DeviceError) -> Self {
        Self {
            register,
            value,
            error: Some(err.to_string()),
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Transient report of an executed command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub command: Command,
    /// One entry per attempted write, in write order.
    pub writes: Vec<WriteOutcome>,
}

impl CommandOutcome {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.writes.iter().all(WriteOutcome::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.writes.iter().filter(|w| !w.succeeded())
    }
}

/// Translates commands into register writes for one [`DeviceProfile`].
pub struct CommandExecutor<C> {
    connector: C,
    profile: DeviceProfile,
    options: ExecutorOptions,
    device_lock: Mutex<()>,
}

impl<C: DeviceConnector> CommandExecutor<C> {
    /// Create an executor bound to `profile` for its whole lifetime.
    pub fn new(connector: C, profile: DeviceProfile, options: ExecutorOptions) -> Self {
        Self {
            connector,
            profile,
            options,
            device_lock: Mutex::new(()),
        }
    }

    /// The active device profile.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Run `command`.
    ///
    /// # Errors
    ///
    /// See the individual command methods.
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, GridChargeError> {
        match command {
            Command::ChargeFromGrid { kw } => self.charge_from_grid(kw).await,
            Command::DischargeToGrid { kw } => self.discharge_to_grid(kw).await,
            Command::StopDischarge => self.stop_discharge().await,
            Command::Normal => self.set_normal().await,
        }
    }

    /// Charge the battery from the grid at `kw`.
    ///
    /// Values outside the profile's nominal range are logged but still sent,
    /// the inverter enforces its own limits.
    ///
    /// # Errors
    ///
    /// Returns [`GridChargeError::Validation`] when `kw` is not finite, and
    /// [`GridChargeError::Device`] on a failed write under
    /// [`WritePolicy::FailFast`].
    #[tracing::instrument(skip(self), fields(profile = self.profile.name))]
    pub async fn charge_from_grid(&self, kw: f64) -> Result<CommandOutcome, GridChargeError> {
        ensure_finite(kw)?;
        tracing::info!(kw, "charging battery from grid");
        self.force(Command::ChargeFromGrid { kw }, kw, Mode::Charge)
            .await
    }

    /// Discharge the battery into the grid at `kw`.
    ///
    /// # Errors
    ///
    /// Same as [`charge_from_grid`](Self::charge_from_grid).
    #[tracing::instrument(skip(self), fields(profile = self.profile.name))]
    pub async fn discharge_to_grid(&self, kw: f64) -> Result<CommandOutcome, GridChargeError> {
        ensure_finite(kw)?;
        tracing::info!(kw, "discharging battery to grid");
        self.force(Command::DischargeToGrid { kw }, kw, Mode::Discharge)
            .await
    }

    /// Keep the battery from discharging by forcing a zero-power charge.
    ///
    /// Issues exactly the same writes as `charge_from_grid(0.0)`.
    ///
    /// # Errors
    ///
    /// [`GridChargeError::Device`] on a failed write under
    /// [`WritePolicy::FailFast`].
    #[tracing::instrument(skip(self), fields(profile = self.profile.name))]
    pub async fn stop_discharge(&self) -> Result<CommandOutcome, GridChargeError> {
        tracing::info!("preventing battery discharge with a 0 kW charge command");
        self.force(Command::StopDischarge, 0.0, Mode::Charge).await
    }

    /// Release forced operation: power 0, then mode Stop.
    ///
    /// # Errors
    ///
    /// [`GridChargeError::Device`] on a failed write under
    /// [`WritePolicy::FailFast`].
    #[tracing::instrument(skip(self), fields(profile = self.profile.name))]
    pub async fn set_normal(&self) -> Result<CommandOutcome, GridChargeError> {
        tracing::info!("setting inverter to normal operating mode");
        let writes = [
            (
                self.profile.power_register,
                self.profile.encode_power(0.0, Mode::Stop),
            ),
            (
                self.profile.mode_register,
                self.profile.mode_value(Mode::Stop),
            ),
        ];
        self.write_sequence(Command::Normal, &writes).await
    }

    /// Read the battery state of charge in percent.
    ///
    /// # Errors
    ///
    /// [`GridChargeError::Device`] when the connection or the read fails.
    #[tracing::instrument(skip(self), fields(profile = self.profile.name))]
    pub async fn read_battery_percentage(&self) -> Result<f64, GridChargeError> {
        let _guard = self.lock_device().await;
        let mut client = self.connector.connect().await.inspect_err(|err| {
            tracing::error!(error = %err, "failed to connect to inverter");
        })?;
        let raw = client.read_register(self.profile.soc_register).await;
        client.close().await;

        let raw = raw.inspect_err(|err| {
            tracing::error!(error = %err, "failed to read state of charge");
        })?;
        let soc = self.profile.decode_soc(raw);
        tracing::info!(raw, soc, "read battery state of charge");
        Ok(soc)
    }

    async fn force(
        &self,
        command: Command,
        kw: f64,
        intent: Mode,
    ) -> Result<CommandOutcome, GridChargeError> {
        if !self.profile.is_nominal_power(kw, intent) {
            tracing::warn!(
                kw,
                max_kw = self.profile.max_power_kw,
                "power {} kW is outside the nominal range, sending anyway",
                format_kw(kw)
            );
        }
        let writes = [
            (
                self.profile.power_register,
                self.profile.encode_power(kw, intent),
            ),
            (self.profile.mode_register, self.profile.mode_value(intent)),
        ];
        self.write_sequence(command, &writes).await
    }

    async fn write_sequence(
        &self,
        command: Command,
        writes: &[(u16, u16)],
    ) -> Result<CommandOutcome, GridChargeError> {
        let _guard = self.lock_device().await;

        let mut outcome = CommandOutcome {
            command,
            writes: Vec::with_capacity(writes.len()),
        };

        let mut client = match self.connector.connect().await {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to connect to inverter");
                if self.options.policy == WritePolicy::FailFast {
                    return Err(err.into());
                }
                outcome.writes.extend(
                    writes
                        .iter()
                        .map(|&(register, value)| WriteOutcome::failed(register, value, &err)),
                );
                return Ok(outcome);
            }
        };

        let result = self.write_all(&mut client, &mut outcome, writes).await;
        client.close().await;
        result.map(|()| outcome)
    }

    async fn lock_device(&self) -> Option<MutexGuard<'_, ()>> {
        if self.options.serialize_device_access {
            Some(self.device_lock.lock().await)
        } else {
            None
        }
    }

    async fn write_all(
        &self,
        client: &mut C::Client,
        outcome: &mut CommandOutcome,
        writes: &[(u16, u16)],
    ) -> Result<(), GridChargeError> {
        for &(register, value) in writes {
            match self.write_with_retry(client, register, value).await {
                Ok(()) => {
                    tracing::info!(register, value, "register written");
                    outcome.writes.push(WriteOutcome::written(register, value));
                }
                Err(err) => {
                    tracing::error!(register, value, error = %err, "failed to write register");
                    if self.options.policy == WritePolicy::FailFast {
                        return Err(err.into());
                    }
                    outcome
                        .writes
                        .push(WriteOutcome::failed(register, value, &err));
                }
            }
        }
        Ok(())
    }

    async fn write_with_retry(
        &self,
        client: &mut C::Client,
        register: u16,
        value: u16,
    ) -> Result<(), DeviceError> {
        let attempts = self.options.write_attempts.max(1);
        let mut attempt = 1;
        loop {
            match client.write_register(register, value).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    tracing::warn!(
                        register,
                        attempt,
                        attempts,
                        error = %err,
                        "register write failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn ensure_finite(kw: f64) -> Result<(), ValidationError> {
    if kw.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinitePower(kw))
    }
}
