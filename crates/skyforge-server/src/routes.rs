use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tracing::Instrument;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use skyforge_core::WindowStore;

use crate::client_ip::client_id;
use crate::dto::{GenerateRequest, GenerateResponse, HealthResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/generate", post(generate))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Panorama generated", body = GenerateResponse),
        (status = 400, description = "Missing or empty prompt", body = crate::dto::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::dto::RateLimitResponse),
        (status = 500, description = "Generation or provider failure", body = crate::dto::ErrorResponse),
        (status = 504, description = "Generation did not finish in time", body = crate::dto::ErrorResponse),
    ),
    tag = "generation"
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let client = client_id(&headers);
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("generate", %request_id, client = %client);

    async move {
        let Json(body) = body?;
        let response = state
            .service
            .handle(&client, body.prompt.as_deref())
            .await?;

        let admission = &response.admission;
        let rate_headers = [
            ("x-ratelimit-limit", admission.limit().to_string()),
            ("x-ratelimit-remaining", admission.remaining().to_string()),
            ("x-ratelimit-reset", admission.reset_at().timestamp().to_string()),
        ];

        Ok::<_, ApiError>((
            rate_headers,
            Json(GenerateResponse {
                url: response.result.url,
            }),
        ))
    }
    .instrument(span)
    .await
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rate_limit_windows = state.service.limiter().store().len().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        rate_limit_windows,
    })
}
