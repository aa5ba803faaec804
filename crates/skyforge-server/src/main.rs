use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use skyforge_client::ReplicateProvider;
use skyforge_core::{GenerationService, InMemoryWindowStore, RateLimiter};
use skyforge_server::config::ServerConfig;
use skyforge_server::routes;
use skyforge_server::state::AppState;

const MAX_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skyforge=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let addr = format!("0.0.0.0:{}", config.port);

    let provider = ReplicateProvider::with_base_url(
        &config.provider_token,
        &config.model_version,
        &config.provider_url,
    )?;

    tracing::info!(provider = provider.base_url(), "Using generation provider");

    let limiter = RateLimiter::new(InMemoryWindowStore::new());
    let sweeper = limiter.start_sweeper(config.sweep_interval);

    let service = GenerationService::new(provider, limiter, config.rate_limit, config.poll);
    let state = Arc::new(AppState::new(service));

    let app = routes::router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(
        window_secs = config.rate_limit.window.as_secs(),
        max = config.rate_limit.max,
        "Starting server on {addr}"
    );
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
