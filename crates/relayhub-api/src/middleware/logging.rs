//! Request/response logging middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info};

use relayhub_realtime::GatewayMetrics;

/// Logged at debug level.
const QUIET_PATHS: [&str; 2] = ["/ping", "/metrics"];

/// Endpoint label for requests that matched no route. Keeps the latency
/// histogram's label set bounded.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Logs method, path, status, duration and request id, and records the
/// request latency histogram.
pub async fn request_logging(
    State(metrics): State<Arc<GatewayMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    metrics.observe_request(method.as_str(), &endpoint, duration);

    if QUIET_PATHS.contains(&path.as_str()) {
        debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_id = %request_id,
            "HTTP request"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_id = %request_id,
            "HTTP request"
        );
    }

    response
}
