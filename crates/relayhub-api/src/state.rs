//! Application state shared across the public router's handlers.

use std::sync::Arc;

use relayhub_core::config::AppConfig;
use relayhub_core::traits::TokenValidator;
use relayhub_realtime::{GatewayMetrics, RealtimeEngine};

/// Passed to every handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Every configured hub.
    pub engine: Arc<RealtimeEngine>,
    /// Bearer token validator used at upgrade time.
    pub validator: Arc<dyn TokenValidator>,
    pub metrics: Arc<GatewayMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish()
    }
}
