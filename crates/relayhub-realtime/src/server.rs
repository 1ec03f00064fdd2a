//! Top-level real-time engine that owns every configured hub.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use relayhub_core::config::RealtimeConfig;
use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;

use crate::hub::Hub;
use crate::metrics::GatewayMetrics;

/// The set of named hubs plus the shared metrics they report into.
pub struct RealtimeEngine {
    hubs: Vec<Arc<Hub>>,
    config: RealtimeConfig,
    metrics: Arc<GatewayMetrics>,
    controllers: Mutex<Vec<JoinHandle<AppResult<()>>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("hubs", &self.hubs.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates one hub per name. Names must be unique.
    pub fn new<'a>(
        config: RealtimeConfig,
        hub_names: impl IntoIterator<Item = &'a str>,
        metrics: Arc<GatewayMetrics>,
    ) -> AppResult<Self> {
        let mut hubs: Vec<Arc<Hub>> = Vec::new();
        for name in hub_names {
            if hubs.iter().any(|h| h.name() == name) {
                return Err(AppError::configuration(format!("Duplicate hub name '{name}'")));
            }
            hubs.push(Hub::new(name, &config, metrics.for_hub(name)));
        }

        info!(hubs = hubs.len(), "Real-time engine initialized");

        Ok(Self {
            hubs,
            config,
            metrics,
            controllers: Mutex::new(Vec::new()),
        })
    }

    /// Spawn every hub's controller on the current runtime.
    pub fn start(&self) {
        let mut controllers = self.controllers.lock().unwrap_or_else(|e| e.into_inner());
        for hub in &self.hubs {
            controllers.push(tokio::spawn(hub.clone().run()));
        }
    }

    pub fn hub(&self, name: &str) -> Option<Arc<Hub>> {
        self.hubs.iter().find(|h| h.name() == name).cloned()
    }

    pub fn hubs(&self) -> &[Arc<Hub>] {
        &self.hubs
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// Stop every hub, then wait for their controllers to exit.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");

        join_all(self.hubs.iter().map(|hub| hub.stop())).await;

        let controllers: Vec<_> = self
            .controllers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for outcome in join_all(controllers).await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Hub controller failed"),
                Err(e) => error!(error = %e, "Hub controller panicked"),
            }
        }

        info!("Real-time engine shut down");
    }
}
