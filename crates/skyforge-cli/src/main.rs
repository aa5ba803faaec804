use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use skyforge_client::ReplicateProvider;
use skyforge_core::traits::GenerationProvider;
use skyforge_core::{
    AppError, ErrorClassifier, GenerationService, InMemoryWindowStore, PollConfig,
    RateLimitConfig, RateLimiter,
};

#[derive(Parser)]
#[command(name = "skyforge", version, about = "360° panorama generation from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Replicate API token
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true, global = true)]
    api_token: Option<String>,

    /// Predictions API base URL
    #[arg(
        long,
        env = "SKYFORGE_PROVIDER_URL",
        default_value = skyforge_client::DEFAULT_BASE_URL,
        global = true
    )]
    base_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a panorama and print its URL
    Generate {
        /// Text description of the scene
        #[arg(short, long)]
        prompt: String,

        /// Model version to run
        #[arg(short = 'v', long, env = "SKYFORGE_MODEL_VERSION")]
        model_version: String,

        /// Milliseconds between status checks
        #[arg(long, env = "SKYFORGE_POLL_INTERVAL_MS", default_value_t = 1_000)]
        poll_interval_ms: u64,

        /// Give up after this many milliseconds
        #[arg(long, env = "SKYFORGE_POLL_MAX_WAIT_MS", default_value_t = 300_000)]
        max_wait_ms: u64,

        /// Double the poll interval after each check, up to this many milliseconds
        #[arg(long)]
        backoff_max_ms: Option<u64>,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the current state of a prediction
    Status {
        /// Prediction ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skyforge=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api_token = cli
        .api_token
        .context("REPLICATE_API_TOKEN not set. Pass --api-token or set the env var.")?;

    match cli.command {
        Commands::Generate {
            prompt,
            model_version,
            poll_interval_ms,
            max_wait_ms,
            backoff_max_ms,
            json,
        } => {
            let provider =
                ReplicateProvider::with_base_url(&api_token, &model_version, &cli.base_url)?;
            let mut poll = PollConfig::from_millis(poll_interval_ms, max_wait_ms)?;
            if let Some(max) = backoff_max_ms {
                poll = poll.with_backoff(2.0, Duration::from_millis(max));
            }

            tokio::select! {
                result = cmd_generate(provider, &prompt, poll, json) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted; the remote prediction may still be running");
                    std::process::exit(130);
                }
            }
        }
        Commands::Status { id } => {
            // Reading a prediction does not need a model version.
            let provider = ReplicateProvider::with_base_url(&api_token, "-", &cli.base_url)?;
            cmd_status(&provider, &id).await?;
        }
    }

    Ok(())
}

async fn cmd_generate(
    provider: ReplicateProvider,
    prompt: &str,
    poll: PollConfig,
    json: bool,
) -> Result<()> {
    // `generate` never consults the limiter; it is only here to build the service.
    let service = GenerationService::new(
        provider,
        RateLimiter::new(InMemoryWindowStore::new()),
        RateLimitConfig::default(),
        poll,
    );

    let result = service.generate(prompt).await.map_err(report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.url);
    }

    Ok(())
}

async fn cmd_status(provider: &ReplicateProvider, id: &str) -> Result<()> {
    let job = provider.get_job(id).await.map_err(report)?;

    println!("{}: {}", job.id, job.status);
    if let Some(output) = &job.raw_output {
        println!("  output: {output}");
    }
    if let Some(error) = &job.error {
        println!("  error:  {error}");
    }

    Ok(())
}

/// Log the full fault and surface its classified form.
fn report(fault: AppError) -> anyhow::Error {
    let classified = ErrorClassifier::classify(&fault);
    tracing::error!(error = %fault, kind = %classified.kind, "Generation failed");
    anyhow::anyhow!("{}", classified.message)
}
