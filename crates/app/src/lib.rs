//! # gridcharge-app
//!
//! Application layer: the automation engine and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceConnector` / `DeviceClient`: register access to the inverter
//!   - `JobStore`: durable persistence of scheduled jobs
//! - Provide the engine components:
//!   - `CommandExecutor`: turns a command into ordered register writes
//!   - `Scheduler`: arms persisted jobs and fires them every day
//!   - `AutomationEngine`: facade called by the HTTP adapter
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `gridcharge-domain` only (plus `tokio` for locks, timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod automation_engine;
pub mod command_executor;
pub mod ports;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;
