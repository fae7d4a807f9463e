// BiasGuard Exporter - live fairness monitor for a federated learning coordinator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # BiasGuard Exporter
//!
//! Polls the coordinator's `/metrics` endpoint and serves the reconciled
//! presentation state as JSON plus Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Watch a local coordinator
//! biasguard-exporter --endpoint http://127.0.0.1:8000
//!
//! # Load settings from a file, override the threshold
//! biasguard-exporter --config monitor.json --threshold 0.2 --port 9090
//! ```

mod metrics;
mod routes;

use biasguard::{MonitorConfig, Poller};
use clap::Parser;
use routes::{router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// BiasGuard fairness exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "BIASGUARD_PORT", default_value = "9100")]
    port: u16,

    /// JSON configuration file
    #[arg(short, long, env = "BIASGUARD_CONFIG")]
    config: Option<String>,

    /// Coordinator base URL
    #[arg(short, long, env = "BIASGUARD_ENDPOINT")]
    endpoint: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short, long, env = "BIASGUARD_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Request timeout in milliseconds
    #[arg(long, env = "BIASGUARD_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    /// Points kept in the accuracy history
    #[arg(long, env = "BIASGUARD_HISTORY_CAPACITY")]
    history_capacity: Option<usize>,

    /// Client whose bias score drives the alert
    #[arg(long, env = "BIASGUARD_NODE")]
    node: Option<String>,

    /// Bias score above which the alert is raised
    #[arg(long, env = "BIASGUARD_THRESHOLD")]
    threshold: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Resolve the monitor configuration: file (or defaults), then flags.
fn build_config(args: &Args) -> biasguard::Result<MonitorConfig> {
    let mut config = match args.config {
        Some(ref path) => MonitorConfig::from_json_file(path)?,
        None => MonitorConfig::default(),
    };

    if let Some(ref endpoint) = args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.poll_interval_ms = interval_ms;
    }
    if let Some(timeout_ms) = args.request_timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    if let Some(capacity) = args.history_capacity {
        config.history_capacity = capacity;
    }
    if let Some(ref node) = args.node {
        config.triggering_node = node.clone();
    }
    if let Some(threshold) = args.threshold {
        config.bias_threshold = threshold;
    }

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("BiasGuard Exporter v{}", env!("CARGO_PKG_VERSION"));

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let poller = match Poller::http(&config) {
        Ok(poller) => poller,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Watching {} every {} ms (alert when {} > {})",
        config.metrics_url(),
        config.poll_interval_ms,
        config.triggering_node,
        config.bias_threshold
    );
    let handle = poller.spawn();

    let state = Arc::new(AppState {
        publisher: handle.publisher(),
        health: handle.shared_health(),
        config,
        start_time: Instant::now(),
    });
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("State endpoint: http://{}/api/state", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            handle.shutdown().await;
            std::process::exit(1);
        }
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    handle.shutdown().await;
    if let Err(e) = served {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
    info!("Exporter stopped");
}
