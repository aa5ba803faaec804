use std::time::Duration;

use thiserror::Error;

use crate::job::JobStatus;

/// Faults raised anywhere between admission and result extraction.
///
/// These are internal values: nothing here is sent to a client directly.
/// The [`ErrorClassifier`](crate::classify::ErrorClassifier) turns them into
/// user-facing [`ClassifiedError`](crate::classify::ClassifiedError)s.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request input failed validation before any provider call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Admission was denied by the rate limiter.
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// A provider call failed at the transport or HTTP level.
    #[error("Provider error{}: {message}", fmt_status(.status_code))]
    Provider {
        message: String,
        status_code: Option<u16>,
    },

    /// The job-creation call itself failed; no job exists.
    #[error("Job submission failed{}: {message}", fmt_status(.status_code))]
    Submission {
        message: String,
        status_code: Option<u16>,
    },

    /// The job was created but reached a non-successful terminal status.
    #[error("Job {job_id} ended with status {status}")]
    JobFailed {
        job_id: String,
        status: JobStatus,
        detail: Option<String>,
    },

    /// The provider reported success with an output shape we cannot read.
    #[error("Malformed provider output: {raw}")]
    MalformedOutput { raw: serde_json::Value },

    /// The job did not reach a terminal status within the wait budget.
    #[error("Job {job_id} still running after {}s", .waited.as_secs())]
    PollTimeout { job_id: String, waited: Duration },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

fn fmt_status(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}

impl AppError {
    /// Returns true if the provider signalled that the addressed resource
    /// does not exist (unknown model version, bad endpoint).
    pub fn is_not_found(&self) -> bool {
        match self {
            AppError::Provider {
                message,
                status_code,
            }
            | AppError::Submission {
                message,
                status_code,
            } => {
                *status_code == Some(404) || {
                    let lower = message.to_lowercase();
                    lower.contains("404") || lower.contains("not found")
                }
            }
            AppError::Generic(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("404") || lower.contains("not found")
            }
            _ => false,
        }
    }
}
