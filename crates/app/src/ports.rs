//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the automation engine and the outside
//! world. They are defined here (in `app`) so that both the engine and the
//! adapter crates can depend on them without creating circular dependencies.

pub mod device;
pub mod job_store;

pub use device::{DeviceClient, DeviceConnector};
pub use job_store::JobStore;
