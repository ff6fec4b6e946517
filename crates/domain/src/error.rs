//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`GridChargeError`] via `#[from]` at the port boundaries.

/// Top-level error returned by every fallible operation of the engine.
#[derive(Debug, thiserror::Error)]
pub enum GridChargeError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("device error")]
    Device(#[from] DeviceError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Input rejected before any I/O happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("time must be formatted as HH:MM, got {0:?}")]
    MalformedTime(String),

    #[error("hour must be within 0..=23, got {0}")]
    HourOutOfRange(u32),

    #[error("minute must be within 0..=59, got {0}")]
    MinuteOutOfRange(u32),

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("power must be a finite number, got {0}")]
    NonFinitePower(f64),

    #[error("power must not be negative, got {0}")]
    NegativePower(f64),
}

/// Lookup of a record that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure talking to the inverter.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The connection could not be established.
    #[error("failed to connect to device at {target}")]
    Connect {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The device was reachable but the request on `register` failed.
    #[error("device request on register {register} failed: {reason}")]
    Protocol { register: u16, reason: String },
}
