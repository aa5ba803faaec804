use std::future::Future;

use crate::error::AppError;
use crate::job::{GenerationRequest, Job};

/// An external, asynchronous image-synthesis service.
///
/// Errors from either call should be [`AppError::Provider`] so the
/// classifier can inspect the HTTP status and message.
pub trait GenerationProvider: Send + Sync + Clone {
    /// Create a job. The returned snapshot's status may already be past `Queued`.
    fn create_job(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Job, AppError>> + Send;

    /// Fetch the current state of a previously created job.
    fn get_job(&self, job_id: &str) -> impl Future<Output = Result<Job, AppError>> + Send;
}
