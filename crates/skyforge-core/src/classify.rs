use std::fmt;

use serde::Serialize;

use crate::error::AppError;

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    RateLimited,
    SubmissionError,
    JobFailed,
    BadProviderResponse,
    ProviderMisconfigured,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::SubmissionError => "submission_error",
            ErrorKind::JobFailed => "job_failed",
            ErrorKind::BadProviderResponse => "bad_provider_response",
            ErrorKind::ProviderMisconfigured => "provider_misconfigured",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault reduced to what the caller is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: u16,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, message: impl Into<String>, http_status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status,
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.http_status, self.message)
    }
}

/// Maps any [`AppError`] onto an [`ErrorKind`], message and HTTP status.
///
/// Total: every fault produces a value, nothing is re-raised.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(fault: &AppError) -> ClassifiedError {
        // A "not found" from the provider means a deployment defect (wrong
        // model version or endpoint), not a transient provider problem.
        if fault.is_not_found() {
            return ClassifiedError::new(
                ErrorKind::ProviderMisconfigured,
                "Generation provider returned 'not found'. Verify the provider \
                 base URL and model version configuration.",
                500,
            );
        }

        match fault {
            AppError::InvalidInput(msg) => ClassifiedError::new(ErrorKind::InvalidInput, msg, 400),
            AppError::RateLimitExceeded { retry_after_secs } => ClassifiedError::new(
                ErrorKind::RateLimited,
                format!("Rate limit exceeded. Try again in {retry_after_secs} seconds."),
                429,
            ),
            AppError::JobFailed { status, .. } => ClassifiedError::new(
                ErrorKind::JobFailed,
                format!("Generation job ended with status '{status}'"),
                500,
            ),
            AppError::MalformedOutput { raw } => ClassifiedError::new(
                ErrorKind::BadProviderResponse,
                format!("Unexpected output format from generation provider: {raw}"),
                500,
            ),
            AppError::PollTimeout { waited, .. } => ClassifiedError::new(
                ErrorKind::Timeout,
                format!(
                    "Generation did not complete within {} seconds",
                    waited.as_secs()
                ),
                504,
            ),
            AppError::Submission { status_code, .. } => ClassifiedError::new(
                ErrorKind::SubmissionError,
                match status_code {
                    Some(code) => format!("Failed to submit generation job (provider HTTP {code})"),
                    None => "Failed to submit generation job".to_string(),
                },
                500,
            ),
            other => ClassifiedError::new(ErrorKind::Unknown, other.to_string(), 500),
        }
    }
}
