//! Report Relay - bug report intake for the game website.
//!
//! # API Endpoints
//!
//! - `OPTIONS /report-bug` - CORS preflight
//! - `GET /report-bug` - Liveness probe
//! - `POST /report-bug` - Submit a bug report
//! - `GET /health` - Health check
//!
//! `/.netlify/functions/report-bug` is kept as an alias for older clients.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use report_relay::api::{AppState, router};
use report_relay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments use the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("report_relay=info".parse()?))
        .init();

    let config = Config::from_env();

    info!(
        port = config.port,
        dry_run = config.dry_run,
        verification = config.verification_enabled(),
        allowed_origins = config.allowed_origins.entries().len(),
        "Starting report relay"
    );
    if !config.dry_run && (config.dispatch_token.is_none() || config.dispatch_repo.is_none()) {
        warn!("GITHUB_DISPATCH_TOKEN or GITHUB_REPO not set; reports will be rejected with 502");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::from_config(config));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Report relay is listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Report relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
