//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod control;
#[allow(clippy::missing_errors_doc)]
pub mod profile;
#[allow(clippy::missing_errors_doc)]
pub mod schedule;
pub mod status;

use axum::Router;
use axum::routing::{delete, get, post};
use serde::{Deserialize, Deserializer};

use gridcharge_app::ports::{DeviceConnector, JobStore};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, C>() -> Router<AppState<S, C>>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    Router::new()
        .route("/control", post(control::execute::<S, C>))
        .route("/status", get(status::get::<S, C>))
        .route("/profile", get(profile::get::<S, C>))
        .route(
            "/schedule",
            get(schedule::list::<S, C>).post(schedule::create::<S, C>),
        )
        .route("/schedule/{id}", delete(schedule::delete::<S, C>))
}

/// Decode a power value given either as a JSON number or as a numeric
/// string such as `"2.5"`.
pub(crate) fn power_kw<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Power {
        Number(f64),
        Text(String),
    }

    match Power::deserialize(deserializer)? {
        Power::Number(kw) => Ok(kw),
        Power::Text(raw) => raw.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("power must be a number, got {raw:?}"))
        }),
    }
}
