//! # gridcharge-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small JSON API (`/api/control`, `/api/status`, `/api/schedule`,
//!   `/api/profile`) and a `/health` check
//! - Map HTTP requests into [`AutomationEngine`](gridcharge_app::automation_engine::AutomationEngine)
//!   calls (driving adapter)
//! - Map engine results and errors into JSON responses and status codes
//!
//! ## Dependency rule
//! Depends on `gridcharge-app` (for the engine and port traits) and
//! `gridcharge-domain` (for domain types used in response mapping). Never
//! leaks axum types into the engine.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
