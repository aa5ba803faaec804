use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use skyforge_core::error::AppError;
use skyforge_core::job::{GenerationRequest, Job, JobStatus};
use skyforge_core::traits::GenerationProvider;
use url::Url;

/// Public Replicate API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a Replicate-compatible predictions API.
///
/// - `POST {base_url}/predictions` creates a prediction for a model version
/// - `GET {base_url}/predictions/{id}` reads its current state
///
/// Each HTTP call is bounded by the client timeout; the overall wait for a
/// prediction is the poller's concern.
#[derive(Clone)]
pub struct ReplicateProvider {
    client: Client,
    base_url: String,
    api_token: String,
    version: String,
}

impl ReplicateProvider {
    pub fn with_base_url(api_token: &str, version: &str, base_url: &str) -> Result<Self, AppError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid provider URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "Provider URL scheme '{}' is not allowed (only http/https)",
                parsed.scheme()
            )));
        }
        if version.trim().is_empty() {
            return Err(AppError::ConfigError(
                "Provider model version must not be empty".into(),
            ));
        }

        let client = Client::builder()
            .user_agent("Skyforge/0.1")
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            version: version.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Transport failures carry no status. The request URL is stripped so
    /// ids or ports in it cannot read as an HTTP status.
    fn map_send_error(e: reqwest::Error) -> AppError {
        let e = e.without_url();
        let message = if e.is_timeout() {
            format!(
                "Request timed out after {} seconds",
                DEFAULT_HTTP_TIMEOUT.as_secs()
            )
        } else if e.is_connect() {
            format!("Connection failed: {e}")
        } else {
            e.to_string()
        };
        AppError::Provider {
            message,
            status_code: None,
        }
    }

    async fn parse_prediction(response: Response) -> Result<Job, AppError> {
        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| format!("HTTP {}: {}", status_code, body));

            return Err(AppError::Provider {
                message,
                status_code: Some(status_code),
            });
        }

        let prediction: Prediction = response.json().await.map_err(|e| AppError::Provider {
            message: format!("Failed to parse prediction: {}", e.without_url()),
            status_code: None,
        })?;

        prediction.into_job()
    }
}

// ---- Replicate API types ----

#[derive(Serialize)]
struct CreatePrediction<'a> {
    version: &'a str,
    input: &'a GenerationRequest,
}

#[derive(Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl Prediction {
    fn into_job(self) -> Result<Job, AppError> {
        let status: JobStatus = self.status.parse().map_err(|e: String| AppError::Provider {
            message: e,
            status_code: None,
        })?;

        let mut job = Job::new(self.id, status);
        job.raw_output = self.output;
        job.error = self.error.map(|e| match e {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(job)
    }
}

#[derive(Deserialize)]
struct ApiError {
    detail: String,
}

impl GenerationProvider for ReplicateProvider {
    async fn create_job(&self, request: &GenerationRequest) -> Result<Job, AppError> {
        let url = format!("{}/predictions", self.base_url);
        let body = CreatePrediction {
            version: &self.version,
            input: request,
        };
        tracing::debug!(%url, version = %self.version, "Creating prediction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Self::parse_prediction(response).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, AppError> {
        let url = format!("{}/predictions/{}", self.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Self::parse_prediction(response).await
    }
}
