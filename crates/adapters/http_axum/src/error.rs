//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use gridcharge_domain::error::GridChargeError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Maps [`GridChargeError`] and malformed request bodies to an HTTP response
/// with appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    Domain(GridChargeError),
    /// The request body could not be decoded.
    Body(JsonRejection),
}

impl From<GridChargeError> for ApiError {
    fn from(err: GridChargeError) -> Self {
        Self::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Domain(err) => err,
            Self::Body(rejection) => {
                tracing::debug!(error = %rejection, "rejected request body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorBody {
                        error: rejection.body_text(),
                    }),
                )
                    .into_response();
            }
        };
        let (status, message) = match &err {
            GridChargeError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            GridChargeError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            GridChargeError::Device(err) => {
                tracing::error!(error = %err, "device error");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            GridChargeError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcharge_domain::error::{DeviceError, NotFoundError, ValidationError};

    fn status_of(err: GridChargeError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn should_map_each_error_kind_to_its_status() {
        assert_eq!(
            status_of(ValidationError::HourOutOfRange(24).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                NotFoundError {
                    entity: "Job",
                    id: "x".to_string()
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                DeviceError::Protocol {
                    register: 40355,
                    reason: "timeout".to_string()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(GridChargeError::Storage("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
