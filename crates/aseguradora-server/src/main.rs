//! Aseguradora Server
//!
//! Insurance policy CRUD service backed by a document store.

use anyhow::Result;
use aseguradora_server::{create_router, AppState, Cli, LogFormat, ServerConfig};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.log_format);

    info!("Starting Aseguradora policy service");

    // Load configuration
    let config = ServerConfig::load(&cli)?;
    info!("Configuration loaded successfully");
    info!("Storage: {}", config.redacted_storage_url());
    info!("Base path: {}", config.base_path);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Open the storage engine; failing here aborts startup
    let store = aseguradora_store::open(&config.storage)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to open storage engine");
            e
        })?;
    info!("Storage engine '{}' ready", store.name());

    let state = AppState::new(store).with_metrics(metrics_handle);
    let app = create_router(state, &config);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}{}", addr, config.base_path);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    // The router, and the storage handle it owns, are dropped by now.
    info!("Storage connection released, server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
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

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("aseguradora=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aseguradora=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "aseguradora_requests_total",
        "Total number of HTTP requests by method, route and status"
    );
    metrics::describe_histogram!(
        "aseguradora_storage_latency_us",
        metrics::Unit::Microseconds,
        "Storage call latency in microseconds by operation"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
