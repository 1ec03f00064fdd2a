//! Application builder: wires hubs, routers and listeners into a running
//! gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{error, info, warn};

use relayhub_core::config::AppConfig;
use relayhub_core::error::{AppError, ErrorKind};
use relayhub_core::result::AppResult;
use relayhub_core::traits::TokenValidator;
use relayhub_realtime::{ControlService, GatewayMetrics, RealtimeEngine};

use crate::control::build_control_router;
use crate::router::build_router;
use crate::state::AppState;

/// A running gateway: the public HTTP listener, one control listener per
/// hub, and the hubs themselves.
pub struct Gateway {
    engine: Arc<RealtimeEngine>,
    http_addr: SocketAddr,
    control_addrs: Vec<(String, SocketAddr)>,
    shutdown: CancellationToken,
    servers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("http_addr", &self.http_addr)
            .field("control_addrs", &self.control_addrs)
            .finish()
    }
}

impl Gateway {
    /// Create every hub, bind every listener and start serving.
    ///
    /// Port `0` in the configuration binds an ephemeral port; the actual
    /// addresses are available from [`Gateway::http_addr`] and
    /// [`Gateway::control_addr`].
    pub async fn start(config: AppConfig, validator: Arc<dyn TokenValidator>) -> AppResult<Self> {
        // ── Step 1: Metrics registry ─────────────────────────────────
        let metrics = Arc::new(GatewayMetrics::new()?);

        // ── Step 2: Hubs ─────────────────────────────────────────────
        let engine = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            config.hubs.iter().map(|hub| hub.name.as_str()),
            metrics.clone(),
        )?);

        // ── Step 3: Bind control listeners ───────────────────────────
        let mut control = Vec::with_capacity(config.hubs.len());
        for hub_config in &config.hubs {
            let hub = engine.hub(&hub_config.name).ok_or_else(|| {
                AppError::internal(format!("Hub '{}' was not created", hub_config.name))
            })?;
            let listener =
                bind(&format!("{}:{}", config.server.host, hub_config.control_port)).await?;
            control.push((hub, listener));
        }

        // ── Step 4: Bind HTTP listener ───────────────────────────────
        let http_listener = bind(&config.server.bind_addr()).await?;
        let http_addr = local_addr(&http_listener)?;

        // ── Step 5: Start hub controllers ────────────────────────────
        engine.start();

        // ── Step 6: Serve ────────────────────────────────────────────
        let shutdown = CancellationToken::new();
        let mut servers = Vec::with_capacity(control.len() + 1);
        let mut control_addrs = Vec::with_capacity(control.len());

        for (hub, listener) in control {
            let addr = local_addr(&listener)?;
            info!(hub = %hub.name(), addr = %addr, "Control plane listening");
            let router = build_control_router(ControlService::new(hub.clone()), metrics.clone());
            servers.push(spawn_server(
                format!("control:{}", hub.name()),
                listener,
                router,
                shutdown.clone(),
            ));
            control_addrs.push((hub.name().to_string(), addr));
        }

        let state = AppState {
            config: Arc::new(config),
            engine: engine.clone(),
            validator,
            metrics,
        };
        info!(addr = %http_addr, "HTTP server listening");
        servers.push(spawn_server(
            "http".to_string(),
            http_listener,
            build_router(state),
            shutdown.clone(),
        ));

        Ok(Self {
            engine,
            http_addr,
            control_addrs,
            shutdown,
            servers,
        })
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Control listener address of the named hub.
    pub fn control_addr(&self, hub: &str) -> Option<SocketAddr> {
        self.control_addrs
            .iter()
            .find(|(name, _)| name == hub)
            .map(|(_, addr)| *addr)
    }

    pub fn engine(&self) -> &Arc<RealtimeEngine> {
        &self.engine
    }

    /// Resolves once shutdown has begun, including when a listener failed.
    pub fn stopping(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Stop accepting, let in-flight requests finish within `grace`, then
    /// stop every hub.
    pub async fn shutdown(self, grace: Duration) {
        info!("Stopping listeners");
        self.shutdown.cancel();

        if tokio::time::timeout(grace, join_all(self.servers)).await.is_err() {
            warn!(grace_secs = grace.as_secs(), "Listeners did not stop within the grace period");
        }

        self.engine.shutdown().await;
        info!("Gateway stopped");
    }
}

async fn bind(addr: &str) -> AppResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| {
            let message = format!("Failed to bind {addr}: {e}");
            AppError::with_source(ErrorKind::Internal, message, e)
        })
}

fn local_addr(listener: &TcpListener) -> AppResult<SocketAddr> {
    listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Listener has no local address: {e}")))
}

/// Serve `router` until `shutdown` fires. A serve error cancels
/// `shutdown` so the whole gateway winds down.
fn spawn_server(
    name: String,
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await;
        if let Err(e) = result {
            error!(server = %name, error = %e, "Listener failed");
            shutdown.cancel();
        }
    })
}
