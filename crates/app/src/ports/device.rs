//! Device port: register-level access to the inverter.
//!
//! The byte-level protocol lives in an adapter crate. The engine only needs
//! to open a connection, read or write single 16-bit holding registers and
//! close the connection again.

use std::future::Future;

use gridcharge_domain::error::DeviceError;

/// Opens a fresh connection to the inverter for every command.
///
/// No connection is shared between calls, so a stale or half-closed socket
/// from one command can never leak into the next.
pub trait DeviceConnector: Send + Sync {
    /// The connected client handed out by [`connect`](Self::connect).
    type Client: DeviceClient + Send;

    /// Establish a new connection.
    fn connect(&self) -> impl Future<Output = Result<Self::Client, DeviceError>> + Send;
}

/// A live connection to the inverter.
pub trait DeviceClient {
    /// Read one holding register.
    fn read_register(
        &mut self,
        register: u16,
    ) -> impl Future<Output = Result<u16, DeviceError>> + Send;

    /// Write one holding register.
    fn write_register(
        &mut self,
        register: u16,
        value: u16,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Release the connection.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}
