//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Remote swap network requests and retries
//! - Rate limiter waits
//! - Swap creation and monitoring
//! - Intent processing outcomes

use crate::error::EngineResult;

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

lazy_static! {
    // Remote swap network metrics
    pub static ref REMOTE_REQUESTS: CounterVec = register_counter_vec!(
        "bridge_remote_requests_total",
        "Total requests to the remote swap network by outcome",
        &["operation", "outcome"]
    ).unwrap();

    pub static ref REMOTE_RETRIES: CounterVec = register_counter_vec!(
        "bridge_remote_retries_total",
        "Total retried requests to the remote swap network",
        &["operation"]
    ).unwrap();

    pub static ref RATE_LIMIT_WAIT: HistogramVec = register_histogram_vec!(
        "bridge_rate_limit_wait_seconds",
        "Time spent waiting for the request rate limiter",
        &[],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    ).unwrap();

    // Swap metrics
    pub static ref SWAPS_CREATED: CounterVec = register_counter_vec!(
        "bridge_swaps_created_total",
        "Total swaps created",
        &["source_network", "destination_network"]
    ).unwrap();

    pub static ref MONITOR_POLLS: CounterVec = register_counter_vec!(
        "bridge_monitor_polls_total",
        "Total swap status polls",
        &[]
    ).unwrap();

    pub static ref MONITOR_OUTCOMES: CounterVec = register_counter_vec!(
        "bridge_monitor_outcomes_total",
        "Swap monitoring results by final status",
        &["status"]
    ).unwrap();

    // Intent metrics
    pub static ref INTENTS_PROCESSED: CounterVec = register_counter_vec!(
        "bridge_intents_processed_total",
        "Total intents processed by action and outcome",
        &["action", "outcome"]
    ).unwrap();

    pub static ref INTENT_LATENCY: HistogramVec = register_histogram_vec!(
        "bridge_intent_latency_seconds",
        "Intent processing latency",
        &["action"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0, 300.0]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> EngineResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_remote_request(operation: &str, success: bool) {
    REMOTE_REQUESTS
        .with_label_values(&[operation, if success { "success" } else { "failure" }])
        .inc();
}

pub fn record_remote_retry(operation: &str) {
    REMOTE_RETRIES.with_label_values(&[operation]).inc();
}

pub fn record_rate_limit_wait(wait_secs: f64) {
    RATE_LIMIT_WAIT.with_label_values(&[]).observe(wait_secs);
}

pub fn record_swap_created(source_network: &str, destination_network: &str) {
    SWAPS_CREATED
        .with_label_values(&[source_network, destination_network])
        .inc();
}

pub fn record_monitor_poll() {
    MONITOR_POLLS.with_label_values(&[]).inc();
}

pub fn record_monitor_outcome(status: &str) {
    MONITOR_OUTCOMES.with_label_values(&[status]).inc();
}

pub fn record_intent_processed(action: &str, success: bool) {
    INTENTS_PROCESSED
        .with_label_values(&[action, if success { "success" } else { "failure" }])
        .inc();
}

pub fn record_intent_latency(action: &str, latency_secs: f64) {
    INTENT_LATENCY
        .with_label_values(&[action])
        .observe(latency_secs);
}
