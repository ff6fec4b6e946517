//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use gridcharge_app::ports::{DeviceConnector, JobStore};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the JSON routes under `/api` and includes a [`TraceLayer`] that
/// logs each HTTP request/response using the `tracing` ecosystem.
pub fn build<S, C>(state: AppState<S, C>) -> Router
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
