//! # gridcharge-domain
//!
//! Pure domain model for the gridcharge battery automation system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Device Profiles** (register map and value encoding of one
//!   inverter family)
//! - Define **Commands** (charge, discharge, stop discharge, normal)
//! - Define **Jobs** (a time-of-day trigger bound to a command)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod job;
pub mod profile;
