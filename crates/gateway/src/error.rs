//! API error type with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::GatewayError;

/// API-level error wrapping the gateway domain error.
///
/// Every error renders as `{"message": "..."}` with the status the error
/// class dictates. Dependency outages map to 503 so the caller knows a
/// retry may succeed; a compensated saga maps to 500 because the booking
/// attempt is spent.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::SagaInProgress => StatusCode::CONFLICT,
            GatewayError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::SagaCompensated { .. } | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "message": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl From<clients::ClientError> for ApiError {
    fn from(err: clients::ClientError) -> Self {
        ApiError(err.into())
    }
}
