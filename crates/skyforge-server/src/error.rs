use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use skyforge_core::RequestError;

use crate::dto::{ErrorResponse, RateLimitResponse};

/// Wrapper so we can implement `IntoResponse` for `RequestError`.
#[derive(Debug)]
pub struct ApiError(pub RequestError);

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        Self(RequestError::InvalidInput(
            "request body must be a JSON object with a string 'prompt'".into(),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            RequestError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: message,
                    kind: None,
                }),
            )
                .into_response(),
            RequestError::RateLimited {
                limit,
                reset_at,
                retry_after_secs,
                message,
            } => {
                let body = RateLimitResponse {
                    error: "Too many requests".into(),
                    message,
                    retry_after: retry_after_secs,
                };
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [
                        ("retry-after", retry_after_secs.to_string()),
                        ("x-ratelimit-limit", limit.to_string()),
                        ("x-ratelimit-remaining", "0".to_string()),
                        ("x-ratelimit-reset", reset_at.timestamp().to_string()),
                    ],
                    Json(body),
                )
                    .into_response()
            }
            RequestError::Classified(classified) => {
                let status = StatusCode::from_u16(classified.http_status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = ErrorResponse {
                    error: classified.message,
                    kind: Some(classified.kind.to_string()),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
