//! Manual inverter control.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use gridcharge_app::command_executor::WriteOutcome;
use gridcharge_app::ports::{DeviceConnector, JobStore};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a manual command.
#[derive(Deserialize)]
pub struct ControlRequest {
    pub action: String,
    /// Kilowatts, only used by `charge` and `discharge`.
    #[serde(default, deserialize_with = "super::power_kw")]
    pub power: f64,
}

/// Outcome of one register write.
#[derive(Serialize)]
pub struct WriteBody {
    pub register: u16,
    pub value: u16,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<WriteOutcome> for WriteBody {
    fn from(write: WriteOutcome) -> Self {
        Self {
            register: write.register,
            value: write.value,
            ok: write.error.is_none(),
            error: write.error,
        }
    }
}

#[derive(Serialize)]
pub struct ControlBody {
    pub status: &'static str,
    pub message: String,
    pub writes: Vec<WriteBody>,
}

/// Possible responses from the control endpoint.
pub enum ControlResponse {
    Ok(Json<ControlBody>),
}

impl IntoResponse for ControlResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/control`: run a command right away.
pub async fn execute<S, C>(
    State(state): State<AppState<S, C>>,
    payload: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<ControlResponse, ApiError>
where
    S: JobStore + Send + Sync + 'static,
    C: DeviceConnector + 'static,
{
    let Json(req) = payload?;
    let report = state.engine.manual_command(&req.action, req.power).await?;
    Ok(ControlResponse::Ok(Json(ControlBody {
        status: report.status,
        message: report.message,
        writes: report
            .outcome
            .writes
            .into_iter()
            .map(WriteBody::from)
            .collect(),
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{Harness, json_request};

    #[tokio::test]
    async fn should_charge_and_report_message() {
        let harness = Harness::new();

        let (status, body) = harness
            .call(json_request(
                "POST",
                "/api/control",
                r#"{"action":"charge","power":2.0}"#,
            ))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Charging from grid at 2.0 kW");
        assert_eq!(body["writes"][0]["register"], 40355);
        assert_eq!(body["writes"][0]["value"], 63536);
        assert_eq!(body["writes"][1]["register"], 40348);
        assert_eq!(harness.device.writes(), vec![(40355, 63536), (40348, 2)]);
    }

    #[tokio::test]
    async fn should_default_power_to_zero() {
        let harness = Harness::new();

        let (status, body) = harness
            .call(json_request("POST", "/api/control", r#"{"action":"normal"}"#))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Inverter set to normal mode");
    }

    #[tokio::test]
    async fn should_return_bad_request_for_unknown_action() {
        let harness = Harness::new();

        let (status, body) = harness
            .call(json_request("POST", "/api/control", r#"{"action":"boost"}"#))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("boost"));
        assert!(harness.device.writes().is_empty());
    }

    #[tokio::test]
    async fn should_accept_power_as_numeric_string() {
        let harness = Harness::new();

        let (status, body) = harness
            .call(json_request(
                "POST",
                "/api/control",
                r#"{"action":"charge","power":"2.5"}"#,
            ))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Charging from grid at 2.5 kW");
        assert_eq!(harness.device.writes(), vec![(40355, 63036), (40348, 2)]);
    }

    #[tokio::test]
    async fn should_return_json_bad_request_for_non_numeric_power() {
        let harness = Harness::new();

        let (status, body) = harness
            .call(json_request(
                "POST",
                "/api/control",
                r#"{"action":"charge","power":"abc"}"#,
            ))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("power"));
        assert!(harness.device.writes().is_empty());
    }

    #[tokio::test]
    async fn should_return_json_bad_request_for_malformed_body() {
        let harness = Harness::new();

        let (status, body) = harness
            .call(json_request("POST", "/api/control", "{not json"))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn should_send_slightly_negative_power() {
        let harness = Harness::new();

        let (status, _) = harness
            .call(json_request(
                "POST",
                "/api/control",
                r#"{"action":"charge","power":-0.05}"#,
            ))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(harness.device.writes(), vec![(40355, 50), (40348, 2)]);
    }

    #[tokio::test]
    async fn should_succeed_with_failed_writes_under_best_effort() {
        let harness = Harness::new();
        harness.device.refuse_connections();

        let (status, body) = harness
            .call(json_request(
                "POST",
                "/api/control",
                r#"{"action":"stop_discharge"}"#,
            ))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["writes"][0]["ok"], false);
        assert_eq!(body["writes"][1]["ok"], false);
    }

    #[tokio::test]
    async fn should_return_bad_gateway_when_fail_fast_write_fails() {
        let harness = Harness::fail_fast();
        harness.device.refuse_connections();

        let (status, _) = harness
            .call(json_request(
                "POST",
                "/api/control",
                r#"{"action":"charge","power":1.0}"#,
            ))
            .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
