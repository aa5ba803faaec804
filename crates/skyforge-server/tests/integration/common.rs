use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use skyforge_client::ReplicateProvider;
use skyforge_core::{GenerationService, InMemoryWindowStore, PollConfig, RateLimitConfig, RateLimiter};
use skyforge_server::routes;
use skyforge_server::state::AppState;

pub const PANORAMA_URL: &str = "https://cdn.example.com/panorama.jpg";

/// How the fake provider treats a prediction, chosen from the prompt text.
#[derive(Debug, Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Malformed,
    Stuck,
}

impl Behavior {
    fn for_prompt(prompt: &str) -> Self {
        if prompt.contains("fail") {
            Self::Fail
        } else if prompt.contains("malformed") {
            Self::Malformed
        } else if prompt.contains("stuck") {
            Self::Stuck
        } else {
            Self::Succeed
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeProvider {
    predictions: Arc<Mutex<HashMap<String, (Behavior, usize)>>>,
    created: Arc<AtomicUsize>,
}

impl FakeProvider {
    /// Number of predictions created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

async fn create_prediction(
    State(fake): State<FakeProvider>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let prompt = body["input"]["prompt"].as_str().unwrap_or_default();
    if prompt.contains("misconfigured") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "The requested resource could not be found."})),
        );
    }

    let n = fake.created.fetch_add(1, Ordering::SeqCst);
    let id = format!("p-{n}");
    fake.predictions
        .lock()
        .unwrap()
        .insert(id.clone(), (Behavior::for_prompt(prompt), 0));

    (
        StatusCode::CREATED,
        Json(json!({"id": id, "status": "starting", "output": null})),
    )
}

async fn get_prediction(
    State(fake): State<FakeProvider>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let mut predictions = fake.predictions.lock().unwrap();
    let Some((behavior, polls)) = predictions.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."})));
    };
    *polls += 1;

    let body = match (*behavior, *polls) {
        (_, 1) => json!({"id": id, "status": "starting"}),
        (Behavior::Stuck, _) | (_, 2) => json!({"id": id, "status": "processing"}),
        (Behavior::Succeed, _) => json!({"id": id, "status": "succeeded", "output": [PANORAMA_URL]}),
        (Behavior::Malformed, _) => json!({"id": id, "status": "succeeded", "output": {}}),
        (Behavior::Fail, _) => json!({"id": id, "status": "failed", "error": "NSFW content detected"}),
    };
    (StatusCode::OK, Json(body))
}

async fn spawn_fake_provider() -> (String, FakeProvider) {
    let fake = FakeProvider::default();
    let router = Router::new()
        .route("/v1/predictions", post(create_prediction))
        .route("/v1/predictions/{id}", get(get_prediction))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}/v1"), fake)
}

pub struct TestApp {
    pub router: Router,
    pub provider: FakeProvider,
}

impl TestApp {
    /// POST `/v1/generate` with a raw body and optional client address.
    pub async fn generate(&self, body: &str, client: Option<&str>) -> Response<Body> {
        let mut request = Request::post("/v1/generate").header("content-type", "application/json");
        if let Some(ip) = client {
            request = request.header("x-forwarded-for", ip);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }
}

/// Build the app against an in-process fake provider.
///
/// Polls every 10ms and gives up after 300ms so stuck jobs time out quickly.
pub async fn setup_test_app(rate_limit_max: u32) -> TestApp {
    let (base_url, provider) = spawn_fake_provider().await;
    let client = ReplicateProvider::with_base_url("r8_test", "abc123", &base_url).unwrap();

    let service = GenerationService::new(
        client,
        RateLimiter::new(InMemoryWindowStore::new()),
        RateLimitConfig::new(Duration::from_secs(60), rate_limit_max).unwrap(),
        PollConfig::new(Duration::from_millis(10), Duration::from_millis(300)).unwrap(),
    );

    TestApp {
        router: routes::router(Arc::new(AppState::new(service))),
        provider,
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
