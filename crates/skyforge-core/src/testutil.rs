//! Test utilities: a scripted in-memory generation provider.
//!
//! Handwritten mock for dependency injection in unit tests. State lives in
//! `Arc<Mutex<_>>` so clones share it and tests can assert on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::job::{GenerationRequest, Job, JobStatus};
use crate::traits::GenerationProvider;

/// Mock provider that replays a scripted status sequence per job.
///
/// Each `get_job` call pops the next scripted snapshot. The last `Ok`
/// snapshot is sticky, so a script of `[Processing]` never finishes.
/// Unknown job ids answer with a 404 provider error.
#[derive(Clone)]
pub struct MockProvider {
    job_id: String,
    scripts: Arc<Mutex<HashMap<String, VecDeque<Result<Job, AppError>>>>>,
    polls: Arc<Mutex<HashMap<String, usize>>>,
    created: Arc<Mutex<Vec<GenerationRequest>>>,
    create_error: Arc<Mutex<Option<AppError>>>,
}

impl MockProvider {
    /// `create_job` returns `job_id`, whose polls walk through `statuses`.
    pub fn new(job_id: &str, statuses: Vec<JobStatus>) -> Self {
        let provider = Self {
            job_id: job_id.to_string(),
            scripts: Arc::new(Mutex::new(HashMap::new())),
            polls: Arc::new(Mutex::new(HashMap::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            create_error: Arc::new(Mutex::new(None)),
        };
        provider.and_job(job_id, statuses)
    }

    /// A provider whose `create_job` fails with `error`.
    pub fn failing_create(error: AppError) -> Self {
        let provider = Self::new("unused", vec![JobStatus::Queued]);
        *provider.create_error.lock().unwrap() = Some(error);
        provider
    }

    /// Script another job that can be polled by id.
    pub fn and_job(self, job_id: &str, statuses: Vec<JobStatus>) -> Self {
        let script = statuses
            .into_iter()
            .map(|status| Ok(Job::new(job_id, status)))
            .collect();
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), script);
        self
    }

    /// Script a job with arbitrary snapshots or errors.
    pub fn and_script(self, job_id: &str, script: Vec<Result<Job, AppError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), script.into());
        self
    }

    /// Attach `output` to every `Succeeded` snapshot of the created job.
    pub fn with_output(self, output: serde_json::Value) -> Self {
        if let Some(script) = self.scripts.lock().unwrap().get_mut(&self.job_id) {
            for job in script.iter_mut().flatten() {
                if job.status == JobStatus::Succeeded {
                    job.raw_output = Some(output.clone());
                }
            }
        }
        self
    }

    /// Number of `get_job` calls made for `job_id`.
    pub fn poll_count(&self, job_id: &str) -> usize {
        self.polls.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }

    /// Every request passed to `create_job`, in order.
    pub fn created_requests(&self) -> Vec<GenerationRequest> {
        self.created.lock().unwrap().clone()
    }
}

impl GenerationProvider for MockProvider {
    async fn create_job(&self, request: &GenerationRequest) -> Result<Job, AppError> {
        if let Some(e) = self.create_error.lock().unwrap().take() {
            return Err(e);
        }
        self.created.lock().unwrap().push(request.clone());
        Ok(Job::new(self.job_id.clone(), JobStatus::Queued))
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, AppError> {
        *self
            .polls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default() += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(job_id) else {
            return Err(AppError::Provider {
                message: format!("prediction {job_id} not found"),
                status_code: Some(404),
            });
        };

        if script.len() == 1 {
            if let Some(Ok(job)) = script.front() {
                return Ok(job.clone());
            }
        }
        script
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Generic(format!("no script left for {job_id}"))))
    }
}
