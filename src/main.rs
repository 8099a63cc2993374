//! stratus-hub server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints and
//! shuts everything down cleanly on Ctrl-C or SIGTERM.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing_subscriber::EnvFilter;

use stratus_hub::app_state::AppState;
use stratus_hub::config::HubConfig;
use stratus_hub::hub::Hub;
use stratus_hub::server;
use stratus_hub::service::MetricsSimulator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = HubConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting stratus-hub");

    // Build hub
    let (hub, dispatcher) = Hub::spawn(config.hub_settings());
    let simulator = Arc::new(MetricsSimulator::new(hub.clone(), config.metrics_interval()));

    // Build application state
    let app_state = AppState {
        hub,
        simulator,
        connection_settings: config.connection_settings(),
        allowed_origins: Arc::new(config.allowed_origins()),
        connections: TaskTracker::new(),
    };

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(
        listener,
        app_state,
        shutdown_signal(),
        config.shutdown_timeout(),
    )
    .await?;

    if tokio::time::timeout(config.shutdown_timeout(), dispatcher)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "dispatcher did not stop in time"
        );
    }
    tracing::info!("server stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
