use crate::error::AppError;
use crate::job::{GenerationParams, GenerationRequest, JobHandle};
use crate::traits::GenerationProvider;

/// Reject prompts that are empty or whitespace-only.
pub fn validate_prompt(prompt: &str) -> Result<(), AppError> {
    if prompt.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "prompt must be a non-empty string".into(),
        ));
    }
    Ok(())
}

/// Issues job-creation calls to the provider.
///
/// The caller controls only the prompt; the negative prompt, resolution,
/// step count and guidance scale are fixed by [`GenerationParams::fixed`].
#[derive(Debug, Clone)]
pub struct JobSubmitter<P: GenerationProvider> {
    provider: P,
    params: GenerationParams,
}

impl<P: GenerationProvider> JobSubmitter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            params: GenerationParams::fixed(),
        }
    }

    /// Create a generation job and return its handle.
    ///
    /// Any failure of the creation call becomes [`AppError::Submission`],
    /// keeping it distinct from a job that was created and later failed.
    pub async fn submit(&self, prompt: &str) -> Result<JobHandle, AppError> {
        validate_prompt(prompt)?;

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            params: self.params.clone(),
        };

        let job = self
            .provider
            .create_job(&request)
            .await
            .map_err(|e| match e {
                AppError::Provider {
                    message,
                    status_code,
                } => AppError::Submission {
                    message,
                    status_code,
                },
                AppError::Submission { .. } => e,
                other => AppError::Submission {
                    message: other.to_string(),
                    status_code: None,
                },
            })?;

        tracing::info!(job_id = %job.id, status = %job.status, "Generation job submitted");
        Ok(job.handle())
    }
}
