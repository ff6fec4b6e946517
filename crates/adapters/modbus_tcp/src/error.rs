//! Transport-level errors of the Modbus TCP adapter.

use std::time::Duration;

use gridcharge_domain::error::DeviceError;

/// Errors raised while exchanging frames with the inverter.
#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("connection closed by device")]
    Closed,

    /// The frame could not be built or the response was rejected
    /// (exception code, wrong transaction, malformed payload).
    #[error("invalid frame: {0}")]
    Frame(String),
}

impl ModbusError {
    pub(crate) fn frame(err: rmodbus::ErrorKind) -> Self {
        Self::Frame(format!("{err:?}"))
    }

    /// Attach the register the failed request was about.
    pub(crate) fn on_register(self, register: u16) -> DeviceError {
        let reason = match &self {
            Self::Io(source) => format!("{self}: {source}"),
            _ => self.to_string(),
        };
        DeviceError::Protocol { register, reason }
    }
}
