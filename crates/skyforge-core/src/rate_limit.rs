//! Per-client fixed-window admission control.
//!
//! Each key (`client_id:route`) owns at most one [`RateWindow`]. The first hit
//! opens a window with `count = 1`; later hits inside the window increment the
//! count, and hits past `max` are denied. Denied hits still count, so a client
//! hammering the endpoint does not earn itself an earlier slot. Once `reset_at`
//! has passed, the next hit replaces the window wholesale.
//!
//! The counters live in a [`WindowStore`]. [`InMemoryWindowStore`] is
//! process-local: several gateway instances do not share budgets unless they
//! are given a store backed by a shared, atomically incremented counter.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use skyforge_core::rate_limit::{InMemoryWindowStore, RateLimitConfig, RateLimiter, rate_limit_key};
//!
//! # async fn run() -> Result<(), skyforge_core::AppError> {
//! let limiter = RateLimiter::new(InMemoryWindowStore::new());
//! let sweeper = limiter.start_sweeper(Duration::from_secs(600));
//!
//! let config = RateLimitConfig::new(Duration::from_secs(60), 10)?;
//! let admission = limiter.admit(&rate_limit_key("203.0.113.7", "generate"), &config).await?;
//! assert!(admission.is_allowed());
//!
//! sweeper.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Default interval between sweeps of expired windows.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Compose the limiter key so budgets are independent per endpoint.
pub fn rate_limit_key(client_id: &str, route: &str) -> String {
    format!("{client_id}:{route}")
}

/// Budget for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of each fixed window.
    pub window: Duration,
    /// Admissions allowed per window.
    pub max: u32,
}

impl RateLimitConfig {
    pub fn new(window: Duration, max: u32) -> Result<Self, AppError> {
        if window.is_zero() {
            return Err(AppError::ConfigError(
                "rate limit window must be greater than zero".into(),
            ));
        }
        if max == 0 {
            return Err(AppError::ConfigError(
                "rate limit max must be at least 1".into(),
            ));
        }
        Ok(Self { window, max })
    }

    pub fn from_millis(window_ms: u64, max: u32) -> Result<Self, AppError> {
        Self::new(Duration::from_millis(window_ms), max)
    }

    fn window_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX)
    }
}

impl Default for RateLimitConfig {
    /// 10 requests per minute.
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max: 10,
        }
    }
}

/// The active counting window for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub key: String,
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateWindow {
    fn open(key: &str, now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            key: key.to_string(),
            count: 1,
            reset_at: now + window,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Denied {
        limit: u32,
        reset_at: DateTime<Utc>,
        retry_after_secs: u64,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }

    pub fn limit(&self) -> u32 {
        match self {
            Admission::Allowed { limit, .. } | Admission::Denied { limit, .. } => *limit,
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            Admission::Allowed { remaining, .. } => *remaining,
            Admission::Denied { .. } => 0,
        }
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        match self {
            Admission::Allowed { reset_at, .. } | Admission::Denied { reset_at, .. } => *reset_at,
        }
    }
}

/// Shared counter storage for the limiter.
///
/// `hit` must be atomic per key: two concurrent hits on the same key must
/// observe distinct counts.
pub trait WindowStore: Send + Sync + Clone + 'static {
    /// Create-or-increment the window for `key` and return the updated window.
    ///
    /// A missing or expired window is replaced by a fresh one with `count = 1`.
    fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> impl Future<Output = Result<RateWindow, AppError>> + Send;

    /// Remove every window whose `reset_at` has passed. Returns how many were removed.
    fn sweep_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, AppError>> + Send;

    /// Number of windows currently held.
    fn len(&self) -> impl Future<Output = usize> + Send;
}

/// Process-local [`WindowStore`] backed by a mutex-guarded map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWindowStore {
    windows: Arc<Mutex<HashMap<String, RateWindow>>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the map lock, recovering from poison if necessary.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned rate limit store");
            poisoned.into_inner()
        })
    }

    /// Snapshot of the window for `key`, if any.
    pub fn get(&self, key: &str) -> Option<RateWindow> {
        self.lock().get(key).cloned()
    }
}

impl WindowStore for InMemoryWindowStore {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> Result<RateWindow, AppError> {
        let mut windows = self.lock();
        let entry = windows
            .entry(key.to_string())
            .and_modify(|w| {
                if w.is_expired(now) {
                    *w = RateWindow::open(key, now, window);
                } else {
                    w.count = w.count.saturating_add(1);
                }
            })
            .or_insert_with(|| RateWindow::open(key, now, window));
        Ok(entry.clone())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| !w.is_expired(now));
        Ok(before - windows.len())
    }

    async fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Fixed-window rate limiter over an injected [`WindowStore`].
#[derive(Debug, Clone)]
pub struct RateLimiter<S: WindowStore = InMemoryWindowStore> {
    store: S,
}

impl<S: WindowStore> RateLimiter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check and record one admission for `key` at the current time.
    pub async fn admit(&self, key: &str, config: &RateLimitConfig) -> Result<Admission, AppError> {
        self.admit_at(key, config, Utc::now()).await
    }

    /// Check and record one admission for `key` as of `now`.
    pub async fn admit_at(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> Result<Admission, AppError> {
        let window = self.store.hit(key, now, config.window_delta()).await?;

        if window.count > config.max {
            let retry_after_secs = ceil_secs(window.reset_at - now);
            tracing::debug!(
                %key,
                count = window.count,
                max = config.max,
                retry_after_secs,
                "Admission denied"
            );
            return Ok(Admission::Denied {
                limit: config.max,
                reset_at: window.reset_at,
                retry_after_secs,
            });
        }

        Ok(Admission::Allowed {
            limit: config.max,
            remaining: config.max - window.count,
            reset_at: window.reset_at,
        })
    }

    /// Spawn the periodic sweep that drops expired windows.
    ///
    /// The task runs until [`SweeperHandle::shutdown`] is called or the
    /// handle is dropped.
    pub fn start_sweeper(&self, interval: Duration) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let store = self.store.clone();

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = token.cancelled() => break,
                }
                match store.sweep_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Swept expired rate limit windows"),
                    Err(e) => tracing::warn!(error = %e, "Rate limit sweep failed"),
                }
            }
            tracing::debug!("Rate limit sweeper stopped");
        });

        SweeperHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Owns the background sweep task started by [`RateLimiter::start_sweeper`].
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Whole seconds until `delta` elapses, rounded up.
fn ceil_secs(delta: TimeDelta) -> u64 {
    let ms = delta.num_milliseconds().max(0) as u64;
    ms.div_ceil(1000)
}
