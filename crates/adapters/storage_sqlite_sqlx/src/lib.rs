//! # gridcharge-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`JobStore`](gridcharge_app::ports::JobStore) port
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain jobs and database rows
//!
//! ## Dependency rule
//! Depends on `gridcharge-app` (for port traits) and `gridcharge-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod job_store;
mod pool;

pub use error::StorageError;
pub use job_store::SqliteJobStore;
pub use pool::{Config, Database};
