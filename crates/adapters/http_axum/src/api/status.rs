//! Battery state of charge.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use gridcharge_app::ports::{DeviceConnector, JobStore};

use crate::error::ErrorBody;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusBody {
    pub soc: f64,
}

/// Possible responses from the status endpoint.
pub enum StatusResponse {
    Ok(Json<StatusBody>),
    Unavailable,
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "Failed to read SoC".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

/// `GET /api/status`: current battery percentage.
pub async fn get<S, C>(State(state): State<AppState<S, C>>) -> StatusResponse
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    match state.engine.current_soc().await {
        Ok(soc) => StatusResponse::Ok(Json(StatusBody { soc })),
        Err(err) => {
            tracing::error!(error = %err, "unable to read state of charge");
            StatusResponse::Unavailable
        }
    }
}
