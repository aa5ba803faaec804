use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::integration::common::{PANORAMA_URL, body_json, setup_test_app};

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app(10).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["rate_limit_windows"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app(10).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/v1/generate"]["post"].is_object());
}

#[tokio::test]
async fn generate_returns_url() {
    let app = setup_test_app(10).await;

    let response = app
        .generate(r#"{"prompt": "a cozy cabin interior"}"#, Some("203.0.113.7"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "10");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let json = body_json(response).await;
    assert_eq!(json["url"], PANORAMA_URL);
    assert_eq!(app.provider.created(), 1);
}

#[tokio::test]
async fn missing_or_blank_prompt_returns_400() {
    let app = setup_test_app(10).await;

    for body in [r#"{}"#, r#"{"prompt": ""}"#, r#"{"prompt": "   "}"#] {
        let response = app.generate(body, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }
    assert_eq!(app.provider.created(), 0);
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = setup_test_app(10).await;

    for body in ["not json", r#"{"prompt": 42}"#] {
        let response = app.generate(body, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn invalid_requests_do_not_consume_quota() {
    let app = setup_test_app(1).await;

    let response = app.generate(r#"{"prompt": ""}"#, Some("192.0.2.1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.generate(r#"{"prompt": "canyon"}"#, Some("192.0.2.1")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn eleventh_request_returns_429() {
    let app = setup_test_app(10).await;

    for _ in 0..10 {
        let response = app
            .generate(r#"{"prompt": "forest"}"#, Some("198.51.100.1"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .generate(r#"{"prompt": "forest"}"#, Some("198.51.100.1"))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let headers = response.headers().clone();
    assert_eq!(headers["x-ratelimit-limit"], "10");
    assert_eq!(headers["x-ratelimit-remaining"], "0");
    let retry_after: u64 = headers["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));

    let json = body_json(response).await;
    assert_eq!(json["error"], "Too many requests");
    assert_eq!(json["retryAfter"], retry_after);
    assert_eq!(app.provider.created(), 10);

    // A different client has its own window.
    let response = app
        .generate(r#"{"prompt": "forest"}"#, Some("198.51.100.2"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_job_returns_500() {
    let app = setup_test_app(10).await;

    let response = app.generate(r#"{"prompt": "please fail"}"#, None).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "job_failed");
    assert!(
        !json["error"].as_str().unwrap().contains("NSFW"),
        "provider failure detail must not leak"
    );
}

#[tokio::test]
async fn malformed_output_returns_500() {
    let app = setup_test_app(10).await;

    let response = app.generate(r#"{"prompt": "malformed output"}"#, None).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "bad_provider_response");
}

#[tokio::test]
async fn unknown_model_version_returns_misconfigured() {
    let app = setup_test_app(10).await;

    let response = app.generate(r#"{"prompt": "misconfigured"}"#, None).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "provider_misconfigured");
}

#[tokio::test]
async fn stuck_job_returns_504() {
    let app = setup_test_app(10).await;

    let response = app.generate(r#"{"prompt": "stuck forever"}"#, None).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = body_json(response).await;
    assert_eq!(json["kind"], "timeout");
}

#[tokio::test]
async fn health_counts_rate_limit_windows() {
    let app = setup_test_app(10).await;

    app.generate(r#"{"prompt": "reef"}"#, Some("192.0.2.10")).await;
    app.generate(r#"{"prompt": "reef"}"#, Some("192.0.2.11")).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["rate_limit_windows"], 2);
}
