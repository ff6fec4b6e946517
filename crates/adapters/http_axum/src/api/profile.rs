//! Active device profile.

use axum::Json;
use axum::extract::State;

use gridcharge_app::ports::{DeviceConnector, JobStore};
use gridcharge_domain::profile::DeviceProfile;

use crate::state::AppState;

/// `GET /api/profile`: register map of the inverter being driven.
pub async fn get<S, C>(State(state): State<AppState<S, C>>) -> Json<DeviceProfile>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    Json(*state.engine.profile())
}
