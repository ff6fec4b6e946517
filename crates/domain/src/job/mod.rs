//! Job: a command bound to a daily trigger.
//!
//! Jobs are persisted and survive restarts. Each job has a [`TimeOfDay`]
//! trigger, an [`ActionKind`] and, for actions that use it, a power
//! parameter in kilowatts.

mod action;
mod trigger;

pub use action::{ActionKind, Command, format_kw};
pub use trigger::TimeOfDay;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::JobId;
use crate::time::Timestamp;

/// A scheduled, recurring inverter command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub trigger: TimeOfDay,
    pub action: ActionKind,
    pub power_kw: f64,
    /// Display label derived from `action` and `power_kw`.
    pub name: String,
    pub created_at: Timestamp,
}

impl Job {
    /// Create a job with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonFinitePower`] or
    /// [`ValidationError::NegativePower`] for unusable power values.
    pub fn new(
        trigger: TimeOfDay,
        action: ActionKind,
        power_kw: f64,
    ) -> Result<Self, ValidationError> {
        validate_power(power_kw)?;
        Ok(Self {
            id: JobId::new(),
            trigger,
            action,
            power_kw,
            name: Self::derive_name(action, power_kw),
            created_at: crate::time::now(),
        })
    }

    /// Display label for an action/power pair.
    #[must_use]
    pub fn derive_name(action: ActionKind, power_kw: f64) -> String {
        match action {
            ActionKind::Charge => format!("Charge at {}kW", format_kw(power_kw)),
            ActionKind::Discharge => format!("Discharge at {}kW", format_kw(power_kw)),
            ActionKind::StopDischarge => "Stop Discharge".to_string(),
            ActionKind::Normal => "Normal".to_string(),
        }
    }

    /// The command executed when this job fires.
    #[must_use]
    pub fn command(&self) -> Command {
        Command::new(self.action, self.power_kw)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the power is not a finite,
    /// non-negative number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_power(self.power_kw)
    }
}

/// Power must be a finite number of kilowatts, never negative.
///
/// # Errors
///
/// See [`Job::new`].
pub fn validate_power(power_kw: f64) -> Result<(), ValidationError> {
    if !power_kw.is_finite() {
        return Err(ValidationError::NonFinitePower(power_kw));
    }
    if power_kw < 0.0 {
        return Err(ValidationError::NegativePower(power_kw));
    }
    Ok(())
}
