use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a generation job on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Progress ordering: all terminal states share the highest rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    /// Accepts both our own names and the provider's (`starting`, `cancelled`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" | "starting" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "canceled" | "cancelled" => Ok(JobStatus::Canceled),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Opaque reference to a job created on the provider.
///
/// Carries only the identifier needed for polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    id: String,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A snapshot of a generation job as last reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Provider output; only meaningful once `status` is `Succeeded`.
    pub raw_output: Option<serde_json::Value>,
    /// Provider-supplied failure text, if any.
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            raw_output: None,
            error: None,
        }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.raw_output = Some(output);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle::new(self.id.clone())
    }

    /// Merge a freshly fetched snapshot into this one.
    ///
    /// Terminal states are absorbing and the status never moves backwards.
    /// Returns false if the fetched snapshot was rejected as a regression.
    pub fn advance(&mut self, fetched: Job) -> bool {
        if self.status.is_terminal() || fetched.status.rank() < self.status.rank() {
            return false;
        }
        self.status = fetched.status;
        self.raw_output = fetched.raw_output;
        self.error = fetched.error;
        true
    }
}

/// Generation input sent to the provider on job creation.
///
/// Only `prompt` comes from the caller; everything else is fixed by
/// [`GenerationParams::fixed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// Non-negotiable generation settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub negative_prompt: &'static str,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}

pub const NEGATIVE_PROMPT: &str = "blurry, low quality, distorted, visible seams, watermark, text, signature, frame, border";

impl GenerationParams {
    /// Equirectangular 2:1 panorama at a fixed quality/cost point.
    pub const fn fixed() -> Self {
        Self {
            negative_prompt: NEGATIVE_PROMPT,
            width: 2048,
            height: 1024,
            num_inference_steps: 50,
            guidance_scale: 7.5,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::fixed()
    }
}
