use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GenerateRequest {
    /// Text description of the panorama.
    #[schema(example = "a cozy cabin interior")]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GenerateResponse {
    /// Location of the generated image.
    pub url: String,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Rate-limit windows currently tracked.
    pub rate_limit_windows: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Failure category, present on classified provider faults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RateLimitResponse {
    pub error: String,
    pub message: String,
    /// Seconds until the current window resets.
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}
