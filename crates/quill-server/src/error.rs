use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use quill_core::CoreError;

/// Maps the platform error kinds onto HTTP statuses. Upstream details
/// are never echoed to callers.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CoreError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid credentials".into()),
            CoreError::NotFound => (StatusCode::NOT_FOUND, "not found".into()),
            CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            CoreError::UpstreamTransient(_) | CoreError::DeadlineExceeded(_) => {
                tracing::error!(error = %self.0, "request failed on upstream dependency");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service temporarily unavailable".into(),
                )
            }
            CoreError::UpstreamPermanent(_) => {
                tracing::error!(error = %self.0, "upstream rejected request");
                (StatusCode::BAD_GATEWAY, "upstream rejected the request".into())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
