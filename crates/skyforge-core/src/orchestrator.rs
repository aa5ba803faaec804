use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::classify::{ClassifiedError, ErrorClassifier};
use crate::error::AppError;
use crate::extract::{ExtractedResult, ResultExtractor};
use crate::job::JobStatus;
use crate::poller::{JobPoller, PollConfig};
use crate::rate_limit::{
    Admission, InMemoryWindowStore, RateLimitConfig, RateLimiter, WindowStore, rate_limit_key,
};
use crate::submit::{JobSubmitter, validate_prompt};
use crate::traits::GenerationProvider;

/// Route identifier used in rate-limit keys for generation requests.
pub const GENERATE_ROUTE: &str = "generate";

/// Successful generation plus the admission that allowed it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub result: ExtractedResult,
    pub admission: Admission,
}

/// Why a request did not produce a result.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Rejected by input validation before admission.
    InvalidInput(String),
    /// Denied by the rate limiter; nothing was submitted.
    RateLimited {
        limit: u32,
        reset_at: DateTime<Utc>,
        retry_after_secs: u64,
        message: String,
    },
    /// A later stage failed.
    Classified(ClassifiedError),
}

/// Orchestrates a generation request: validate → admit → submit → poll → extract.
///
/// Each stage short-circuits. Validation and admission failures are reported
/// directly; every fault after admission goes through [`ErrorClassifier`].
pub struct GenerationService<P, S = InMemoryWindowStore>
where
    P: GenerationProvider,
    S: WindowStore,
{
    limiter: RateLimiter<S>,
    submitter: JobSubmitter<P>,
    poller: JobPoller<P>,
    rate_limit: RateLimitConfig,
    poll: PollConfig,
}

impl<P, S> GenerationService<P, S>
where
    P: GenerationProvider,
    S: WindowStore,
{
    pub fn new(
        provider: P,
        limiter: RateLimiter<S>,
        rate_limit: RateLimitConfig,
        poll: PollConfig,
    ) -> Self {
        Self {
            limiter,
            submitter: JobSubmitter::new(provider.clone()),
            poller: JobPoller::new(provider),
            rate_limit,
            poll,
        }
    }

    pub fn limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    /// Handle one client request end to end.
    pub async fn handle(
        &self,
        client_id: &str,
        prompt: Option<&str>,
    ) -> Result<GenerationResponse, RequestError> {
        // 1. Validate
        let prompt = prompt.ok_or_else(|| RequestError::InvalidInput("prompt is required".into()))?;
        validate_prompt(prompt).map_err(|e| match e {
            AppError::InvalidInput(msg) => RequestError::InvalidInput(msg),
            other => RequestError::InvalidInput(other.to_string()),
        })?;

        // 2. Admit
        let key = rate_limit_key(client_id, GENERATE_ROUTE);
        let admission = self
            .limiter
            .admit(&key, &self.rate_limit)
            .await
            .map_err(|e| self.fail(client_id, &e))?;

        if let Admission::Denied {
            limit,
            reset_at,
            retry_after_secs,
        } = admission
        {
            tracing::info!(%key, retry_after_secs, "Rate limit exceeded");
            let classified =
                ErrorClassifier::classify(&AppError::RateLimitExceeded { retry_after_secs });
            return Err(RequestError::RateLimited {
                limit,
                reset_at,
                retry_after_secs,
                message: classified.message,
            });
        }

        // 3-5. Submit, poll, extract
        let result = self
            .generate(prompt)
            .await
            .map_err(|e| self.fail(client_id, &e))?;

        Ok(GenerationResponse { result, admission })
    }

    /// Submit a job for `prompt`, wait for it, and extract the result.
    ///
    /// No admission control; callers that face untrusted clients use
    /// [`handle`](Self::handle).
    pub async fn generate(&self, prompt: &str) -> Result<ExtractedResult, AppError> {
        let handle = self.submitter.submit(prompt).await?;
        let job = self.poller.await_terminal(&handle, &self.poll).await?;

        match job.status {
            JobStatus::Succeeded => {
                let raw = job.raw_output.unwrap_or(Value::Null);
                let result = ResultExtractor::extract(&raw)?;
                tracing::info!(job_id = %job.id, url = %result.url, "Generation succeeded");
                Ok(result)
            }
            status => Err(AppError::JobFailed {
                job_id: job.id,
                status,
                detail: job.error,
            }),
        }
    }

    fn fail(&self, client_id: &str, fault: &AppError) -> RequestError {
        let classified = ErrorClassifier::classify(fault);
        match fault {
            AppError::JobFailed {
                job_id,
                status,
                detail,
            } => {
                tracing::warn!(%client_id, %job_id, %status, ?detail, kind = %classified.kind, "Generation failed");
            }
            _ => {
                tracing::warn!(%client_id, error = %fault, kind = %classified.kind, "Generation failed");
            }
        }
        RequestError::Classified(classified)
    }
}
