pub mod classify;
pub mod error;
pub mod extract;
pub mod job;
pub mod orchestrator;
pub mod poller;
pub mod rate_limit;
pub mod submit;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use classify::{ClassifiedError, ErrorClassifier, ErrorKind};
pub use error::AppError;
pub use extract::{ExtractedResult, ResultExtractor};
pub use job::{GenerationParams, GenerationRequest, Job, JobHandle, JobStatus};
pub use orchestrator::{GENERATE_ROUTE, GenerationResponse, GenerationService, RequestError};
pub use poller::{JobPoller, PollConfig, PollEvent, PollReporter, TracingPollReporter};
pub use rate_limit::{
    Admission, InMemoryWindowStore, RateLimitConfig, RateLimiter, RateWindow, SweeperHandle,
    WindowStore, rate_limit_key,
};
pub use submit::JobSubmitter;
pub use traits::GenerationProvider;
