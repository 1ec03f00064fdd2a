//! Route table of one hub's control listener.

use std::sync::Arc;

use axum::Router;
use axum::routing::post;

use relayhub_realtime::{ControlService, GatewayMetrics};

use super::error::rpc_panic_response;
use super::handlers;
use crate::middleware::with_request_layers;

/// Build the control router for the hub behind `service`.
pub fn build_control_router(service: ControlService, metrics: Arc<GatewayMetrics>) -> Router {
    let routes = Router::new()
        .route("/rpc/GetOnline", post(handlers::get_online))
        .route("/rpc/GetOnlineUsers", post(handlers::get_online_users))
        .route("/rpc/SendMessage", post(handlers::send_message))
        .route("/rpc/Broadcast", post(handlers::broadcast))
        .with_state(service);

    with_request_layers(routes, metrics, rpc_panic_response)
}
