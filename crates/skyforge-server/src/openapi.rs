use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Skyforge API",
        version = "0.1.0",
        description = "Rate-limited gateway for 360° panorama generation."
    ),
    paths(crate::routes::generate, crate::routes::health),
    components(schemas(
        crate::dto::GenerateRequest,
        crate::dto::GenerateResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
        crate::dto::RateLimitResponse,
    )),
    tags(
        (name = "generation", description = "Panorama generation"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
