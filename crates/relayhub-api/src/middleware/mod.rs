//! Middleware shared by the public and control routers.

pub mod logging;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::response::Response;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use relayhub_realtime::GatewayMetrics;

/// Builds the response for a handler panic.
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Wrap `router` with panic recovery, request ids, tracing and request
/// logging. Outermost to innermost: catch-panic, set request id, trace,
/// propagate request id, logging.
pub fn with_request_layers(
    router: Router,
    metrics: Arc<GatewayMetrics>,
    on_panic: PanicHandler,
) -> Router {
    router
        .layer(axum_middleware::from_fn_with_state(
            metrics,
            logging::request_logging,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CatchPanicLayer::custom(on_panic))
}
