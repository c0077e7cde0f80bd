//! Backbeat Relayer monitoring binary
//!
//! The reliability services themselves are a library consumed by the game's
//! HTTP layer; this binary hosts the operational surface: the health/status
//! API and the Prometheus metrics endpoint.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use backbeat_relayer::api;
use backbeat_relayer::config::Settings;
use backbeat_relayer::engine::EngineClient;
use backbeat_relayer::metrics::MetricsServer;
use backbeat_relayer::supervisor::InFlightRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting Backbeat Relayer v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Engine endpoint: {} (chain {})",
        settings.engine.base_url, settings.engine.chain
    );

    // Constructed here so configuration problems surface at startup rather
    // than on the first game flow
    let _engine = Arc::new(EngineClient::new(&settings.engine)?);
    let inflight = Arc::new(InFlightRegistry::new());

    let api_handle = tokio::spawn({
        let api_config = settings.api.clone();
        let inflight = inflight.clone();
        async move {
            if let Err(e) = api::run_server(api_config, inflight).await {
                error!("API server error: {}", e);
            }
        }
    });

    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Backbeat Relayer is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Backbeat Relayer stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,backbeat_relayer=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
