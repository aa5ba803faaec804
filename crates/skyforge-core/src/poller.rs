//! Drives a submitted job to a terminal status.
//!
//! ```text
//! QUEUED --> PROCESSING --> SUCCEEDED
//!    |            |-------> FAILED
//!    |----------------------> CANCELED
//! ```
//!
//! The poller fetches the job, returns if it is terminal, otherwise sleeps one
//! interval and fetches again. Total wait is bounded by [`PollConfig::max_wait`];
//! a job still running at the deadline yields [`AppError::PollTimeout`].
//! Each poll is an independent future, so any number of jobs can be polled
//! concurrently on a shared runtime.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::AppError;
use crate::job::{Job, JobHandle, JobStatus};
use crate::traits::GenerationProvider;

/// Timing for a single poll loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    /// Delay between status checks.
    pub interval: Duration,
    /// Upper bound on total time spent waiting for a terminal status.
    pub max_wait: Duration,
    /// Growth factor applied to `interval` after each check. `1.0` keeps it fixed.
    pub backoff_multiplier: f64,
    /// Cap for the grown interval.
    pub max_interval: Duration,
}

impl PollConfig {
    /// Fixed-interval polling. Both durations must be non-zero.
    pub fn new(interval: Duration, max_wait: Duration) -> Result<Self, AppError> {
        if interval.is_zero() {
            return Err(AppError::ConfigError(
                "poll interval must be greater than zero".into(),
            ));
        }
        if max_wait.is_zero() {
            return Err(AppError::ConfigError(
                "poll max wait must be greater than zero".into(),
            ));
        }
        Ok(Self::fixed(interval, max_wait))
    }

    pub fn from_millis(interval_ms: u64, max_wait_ms: u64) -> Result<Self, AppError> {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(max_wait_ms),
        )
    }

    const fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
            backoff_multiplier: 1.0,
            max_interval: interval,
        }
    }

    /// Grow the interval by `multiplier` after each check, up to `max_interval`.
    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self.max_interval = max_interval.max(self.interval);
        self
    }

    /// Interval to use after a check that waited `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return current;
        }
        let next_ms = (current.as_millis() as f64 * self.backoff_multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_interval)
    }
}

impl Default for PollConfig {
    /// Check every second, give up after five minutes.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1), Duration::from_secs(300))
    }
}

/// Events emitted while polling, for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PollEvent<'a> {
    Started {
        job_id: &'a str,
    },
    StatusFetched {
        job_id: &'a str,
        attempt: u32,
        status: JobStatus,
    },
    /// The provider reported a less progressed status than already seen; ignored.
    StatusRegressed {
        job_id: &'a str,
        current: JobStatus,
        fetched: JobStatus,
    },
    Terminal {
        job_id: &'a str,
        status: JobStatus,
        attempts: u32,
        elapsed: Duration,
    },
    TimedOut {
        job_id: &'a str,
        attempts: u32,
        waited: Duration,
    },
}

/// Receives poll events. Called inline from the poll loop, so it must not block.
pub trait PollReporter: Send + Sync {
    fn report(&self, event: PollEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPollReporter;

impl PollReporter for TracingPollReporter {
    fn report(&self, event: PollEvent<'_>) {
        match event {
            PollEvent::Started { job_id } => {
                tracing::debug!(%job_id, "Polling job");
            }
            PollEvent::StatusFetched {
                job_id,
                attempt,
                status,
            } => {
                tracing::info!(%job_id, attempt, %status, "Job status fetched");
            }
            PollEvent::StatusRegressed {
                job_id,
                current,
                fetched,
            } => {
                tracing::warn!(%job_id, %current, %fetched, "Ignoring status regression");
            }
            PollEvent::Terminal {
                job_id,
                status,
                attempts,
                elapsed,
            } => {
                tracing::info!(
                    %job_id,
                    %status,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Job reached terminal status"
                );
            }
            PollEvent::TimedOut {
                job_id,
                attempts,
                waited,
            } => {
                tracing::warn!(
                    %job_id,
                    attempts,
                    waited_ms = waited.as_millis() as u64,
                    "Gave up waiting for job"
                );
            }
        }
    }
}

/// Polls the provider until a job is terminal or the wait budget runs out.
#[derive(Debug, Clone)]
pub struct JobPoller<P: GenerationProvider> {
    provider: P,
}

impl<P: GenerationProvider> JobPoller<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Wait for `handle` to reach a terminal status, logging via `tracing`.
    pub async fn await_terminal(
        &self,
        handle: &JobHandle,
        config: &PollConfig,
    ) -> Result<Job, AppError> {
        self.await_terminal_with_reporter(handle, config, &TracingPollReporter)
            .await
    }

    /// Wait for `handle` to reach a terminal status, reporting each step.
    ///
    /// The returned job is always terminal. Status never moves backwards:
    /// a fetched snapshot less progressed than the current one is dropped.
    pub async fn await_terminal_with_reporter<R: PollReporter>(
        &self,
        handle: &JobHandle,
        config: &PollConfig,
        reporter: &R,
    ) -> Result<Job, AppError> {
        let job_id = handle.id();
        let started = Instant::now();
        let deadline = started + config.max_wait;
        // A fetch in flight at the deadline gets one extra interval to answer.
        let fetch_deadline = deadline + config.interval;

        reporter.report(PollEvent::Started { job_id });

        let mut attempts = 1;
        let mut current = self.fetch(job_id, fetch_deadline, started).await?;
        reporter.report(PollEvent::StatusFetched {
            job_id,
            attempt: attempts,
            status: current.status,
        });

        let mut interval = config.interval;
        loop {
            if current.status.is_terminal() {
                reporter.report(PollEvent::Terminal {
                    job_id,
                    status: current.status,
                    attempts,
                    elapsed: started.elapsed(),
                });
                return Ok(current);
            }

            let now = Instant::now();
            if now >= deadline {
                let waited = now - started;
                reporter.report(PollEvent::TimedOut {
                    job_id,
                    attempts,
                    waited,
                });
                return Err(AppError::PollTimeout {
                    job_id: job_id.to_string(),
                    waited,
                });
            }

            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = config.next_interval(interval);

            attempts += 1;
            let fetched = self.fetch(job_id, fetch_deadline, started).await?;
            let fetched_status = fetched.status;
            reporter.report(PollEvent::StatusFetched {
                job_id,
                attempt: attempts,
                status: fetched_status,
            });

            if !current.advance(fetched) {
                reporter.report(PollEvent::StatusRegressed {
                    job_id,
                    current: current.status,
                    fetched: fetched_status,
                });
            }
        }
    }

    async fn fetch(&self, job_id: &str, until: Instant, started: Instant) -> Result<Job, AppError> {
        tokio::time::timeout_at(until, self.provider.get_job(job_id))
            .await
            .map_err(|_| AppError::PollTimeout {
                job_id: job_id.to_string(),
                waited: started.elapsed(),
            })?
    }
}
