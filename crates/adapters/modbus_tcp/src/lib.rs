//! # gridcharge-adapter-modbus-tcp
//!
//! Modbus TCP adapter built on [rmodbus](https://docs.rs/rmodbus).
//!
//! ## Responsibilities
//! - Implement the [`DeviceConnector`](gridcharge_app::ports::DeviceConnector)
//!   and [`DeviceClient`](gridcharge_app::ports::DeviceClient) ports
//! - Frame single-register reads (function `0x03`) and writes (function `0x06`)
//! - Bound every connect and every request/response exchange by a timeout
//!
//! ## Dependency rule
//! Depends on `gridcharge-app` (for port traits) and `gridcharge-domain` (for
//! the device error type). Nothing outside the daemon references this crate.

mod client;
mod error;

pub use client::{Config, ModbusTcpClient, ModbusTcpConnector};
pub use error::ModbusError;
