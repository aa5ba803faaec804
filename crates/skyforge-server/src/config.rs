use std::str::FromStr;
use std::time::Duration;

use skyforge_client::DEFAULT_BASE_URL;
use skyforge_core::AppError;
use skyforge_core::poller::PollConfig;
use skyforge_core::rate_limit::{DEFAULT_SWEEP_INTERVAL, RateLimitConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub provider_url: String,
    pub provider_token: String,
    pub model_version: String,
    pub rate_limit: RateLimitConfig,
    pub poll: PollConfig,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `REPLICATE_API_TOKEN` (required)
    /// - `SKYFORGE_MODEL_VERSION` (required)
    /// - `SKYFORGE_PROVIDER_URL` (optional, defaults to the Replicate API)
    /// - `SKYFORGE_PORT` (optional, defaults to 3000)
    /// - `SKYFORGE_RATE_LIMIT_WINDOW_MS` / `SKYFORGE_RATE_LIMIT_MAX` (60000 / 10)
    /// - `SKYFORGE_POLL_INTERVAL_MS` / `SKYFORGE_POLL_MAX_WAIT_MS` (1000 / 300000)
    /// - `SKYFORGE_SWEEP_INTERVAL_SECS` (600)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_token = lookup("REPLICATE_API_TOKEN").ok_or_else(|| {
            AppError::ConfigError("REPLICATE_API_TOKEN not set. Required to reach the provider.".into())
        })?;
        let model_version = lookup("SKYFORGE_MODEL_VERSION").ok_or_else(|| {
            AppError::ConfigError("SKYFORGE_MODEL_VERSION not set. Required for job creation.".into())
        })?;
        let provider_url =
            lookup("SKYFORGE_PROVIDER_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let port = parse_positive(&lookup, "SKYFORGE_PORT", 3000u16)?;
        let window_ms = parse_positive(&lookup, "SKYFORGE_RATE_LIMIT_WINDOW_MS", 60_000u64)?;
        let max = parse_positive(&lookup, "SKYFORGE_RATE_LIMIT_MAX", 10u32)?;
        let interval_ms = parse_positive(&lookup, "SKYFORGE_POLL_INTERVAL_MS", 1_000u64)?;
        let max_wait_ms = parse_positive(&lookup, "SKYFORGE_POLL_MAX_WAIT_MS", 300_000u64)?;
        let sweep_secs = parse_positive(
            &lookup,
            "SKYFORGE_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?;

        Ok(Self {
            port,
            provider_url,
            provider_token,
            model_version,
            rate_limit: RateLimitConfig::from_millis(window_ms, max)?,
            poll: PollConfig::from_millis(interval_ms, max_wait_ms)?,
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

fn parse_positive<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let parsed: T = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {name} '{raw}': must be a positive integer"))
    })?;
    if parsed == T::default() {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}
