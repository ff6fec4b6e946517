//! Action: what a job or a manual request asks the inverter to do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The kind of command, as named on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Charge the battery from the grid at a given power.
    Charge,
    /// Charge at zero power, which keeps the battery from discharging.
    StopDischarge,
    /// Hand control back to the inverter's own logic.
    Normal,
    /// Push battery energy into the grid at a given power.
    Discharge,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::StopDischarge => "stop_discharge",
            Self::Normal => "normal",
            Self::Discharge => "discharge",
        }
    }

    /// Whether the power parameter means anything for this action.
    #[must_use]
    pub fn uses_power(self) -> bool {
        matches!(self, Self::Charge | Self::Discharge)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "charge" => Ok(Self::Charge),
            "stop_discharge" => Ok(Self::StopDischarge),
            "normal" => Ok(Self::Normal),
            "discharge" => Ok(Self::Discharge),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }
}

/// A fully parameterised inverter command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ChargeFromGrid { kw: f64 },
    DischargeToGrid { kw: f64 },
    StopDischarge,
    Normal,
}

impl Command {
    /// Bind an action to its power parameter. Power is ignored for actions
    /// that do not use it.
    #[must_use]
    pub fn new(action: ActionKind, power_kw: f64) -> Self {
        match action {
            ActionKind::Charge => Self::ChargeFromGrid { kw: power_kw },
            ActionKind::Discharge => Self::DischargeToGrid { kw: power_kw },
            ActionKind::StopDischarge => Self::StopDischarge,
            ActionKind::Normal => Self::Normal,
        }
    }

    #[must_use]
    pub fn action(&self) -> ActionKind {
        match self {
            Self::ChargeFromGrid { .. } => ActionKind::Charge,
            Self::DischargeToGrid { .. } => ActionKind::Discharge,
            Self::StopDischarge => ActionKind::StopDischarge,
            Self::Normal => ActionKind::Normal,
        }
    }

    /// Human readable confirmation shown to whoever issued the command.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ChargeFromGrid { kw } => format!("Charging from grid at {} kW", format_kw(*kw)),
            Self::DischargeToGrid { kw } => {
                format!("Discharging to grid at {} kW", format_kw(*kw))
            }
            Self::StopDischarge => "Battery discharge prevented".to_string(),
            Self::Normal => "Inverter set to normal mode".to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChargeFromGrid { kw } | Self::DischargeToGrid { kw } => {
                write!(f, "{}({}kW)", self.action(), format_kw(*kw))
            }
            Self::StopDischarge | Self::Normal => write!(f, "{}", self.action()),
        }
    }
}

/// Render a kilowatt value the way users type it: whole numbers keep one
/// decimal (`2.0`), everything else uses the shortest exact form (`2.25`).
#[must_use]
pub fn format_kw(kw: f64) -> String {
    if kw.is_finite() && kw.fract() == 0.0 {
        format!("{kw:.1}")
    } else {
        format!("{kw}")
    }
}
