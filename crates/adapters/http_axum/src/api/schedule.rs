//! Scheduled job management.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use gridcharge_app::automation_engine::ScheduleEntry;
use gridcharge_app::ports::{DeviceConnector, JobStore};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for scheduling a job.
#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    /// `H:MM` or `HH:MM`, local time.
    pub time: String,
    pub action: String,
    #[serde(default, deserialize_with = "super::power_kw")]
    pub power: f64,
}

#[derive(Serialize)]
pub struct EntryBody {
    pub id: String,
    pub name: String,
    pub time: String,
}

impl From<ScheduleEntry> for EntryBody {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            name: entry.name,
            time: entry.time,
        }
    }
}

#[derive(Serialize)]
pub struct CreatedBody {
    pub id: String,
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct DeletedBody {
    pub status: &'static str,
    pub message: &'static str,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<EntryBody>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<CreatedBody>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    Ok(Json<DeletedBody>),
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/schedule`: every job, ordered by time of day.
pub async fn list<S, C>(State(state): State<AppState<S, C>>) -> ListResponse
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    let entries = state.engine.schedule_list().await;
    ListResponse::Ok(Json(entries.into_iter().map(EntryBody::from).collect()))
}

/// `POST /api/schedule`: add a daily job.
pub async fn create<S, C>(
    State(state): State<AppState<S, C>>,
    payload: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> Result<CreateResponse, ApiError>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    let Json(req) = payload?;
    let job = state
        .engine
        .schedule_add(&req.time, &req.action, req.power)
        .await?;
    Ok(CreateResponse::Created(Json(CreatedBody {
        id: job.id.to_string(),
        status: "success",
        message: "Job scheduled!",
    })))
}

/// `DELETE /api/schedule/{id}`: remove a job.
pub async fn delete<S, C>(
    State(state): State<AppState<S, C>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    state.engine.schedule_remove(&id).await?;
    Ok(DeleteResponse::Ok(Json(DeletedBody {
        status: "success",
        message: "Job deleted.",
    })))
}
