//! Bridge orchestrator service
//!
//! Serves the transaction API over the orchestration core and exposes
//! Prometheus metrics.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use bridge_orchestrator::api::{self, AppState};
use bridge_orchestrator::bridge::BridgeValidator;
use bridge_orchestrator::config::Settings;
use bridge_orchestrator::handlers::TransactionProcessor;
use bridge_orchestrator::log_store::InMemoryLogStore;
use bridge_orchestrator::metrics::MetricsServer;
use bridge_orchestrator::remote::{LayerswapClient, SwapApi};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting bridge orchestrator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration: {} -> {} by default, mode {:?}",
        settings.bridge.default_source_network,
        settings.bridge.default_destination_network,
        settings.bridge.mode
    );

    let shutdown = CancellationToken::new();

    // Remote swap network client, shared by validator, handlers and API
    let swaps: Arc<dyn SwapApi> = Arc::new(LayerswapClient::new(&settings.bridge)?);
    let validator = Arc::new(BridgeValidator::new(swaps.clone(), &settings.bridge)?);
    let processor = Arc::new(TransactionProcessor::standard(
        &settings,
        swaps.clone(),
        validator.clone(),
        shutdown.child_token(),
    ));
    info!("Transaction processor initialized");

    let state = AppState {
        processor,
        validator,
        swaps,
        log_store: Arc::new(InMemoryLogStore::new()),
        request_deadline: settings.request_deadline(),
    };

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = api::run_server(config, state, shutdown).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(shutdown).await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Bridge orchestrator is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");
    shutdown.cancel();

    // Give in-flight requests a moment to observe cancellation
    if tokio::time::timeout(Duration::from_secs(10), api_handle)
        .await
        .is_err()
    {
        warn!("API server did not stop within 10s");
    }
    if let Some(handle) = metrics_handle {
        handle.abort();
    }

    info!("Bridge orchestrator stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,bridge_orchestrator=debug,hyper=warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
