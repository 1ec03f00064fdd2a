//! RelayHub Server: real-time WebSocket gateway
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use tracing_subscriber::{EnvFilter, fmt};

use relayhub_api::Gateway;
use relayhub_auth::JwtValidator;
use relayhub_core::config::{AppConfig, LoggingConfig};
use relayhub_core::result::AppResult;
use relayhub_core::traits::TokenValidator;

/// Upper bound on draining HTTP and control listeners at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);
    let span = root_span(&config.logging);

    if let Err(e) = run(config).instrument(span).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level()));

    if config.env_type.is_dev() {
        fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    }
}

/// Process-wide span carrying the log-shipping destination and labels.
fn root_span(config: &LoggingConfig) -> tracing::Span {
    let labels = match config.parsed_labels() {
        Ok(labels) => labels,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed LOKI_LABELS");
            Default::default()
        }
    };
    let labels = serde_json::to_string(&labels).unwrap_or_default();

    tracing::info_span!(
        "relayhub",
        env = %config.env_type,
        shipping_url = %config.shipping_url,
        labels = %labels,
    )
}

/// Main server run function
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        hubs = config.hubs.len(),
        "Starting RelayHub"
    );

    // ── Step 1: Token validator ──────────────────────────────────
    let validator: Arc<dyn TokenValidator> = Arc::new(JwtValidator::new(&config.auth));

    // ── Step 2: Hubs and listeners ───────────────────────────────
    let gateway = Gateway::start(config, validator).await?;

    // ── Step 3: Wait for a stop condition ────────────────────────
    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        }
        _ = gateway.stopping() => {
            tracing::warn!("A listener stopped unexpectedly, shutting down");
        }
    }

    // ── Step 4: Graceful shutdown ────────────────────────────────
    gateway.shutdown(SHUTDOWN_GRACE).await;

    tracing::info!("RelayHub shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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
