//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use relayhub_realtime::metrics::CONTENT_TYPE as EXPOSITION_FORMAT;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.encode()?;
    Ok(([(CONTENT_TYPE, EXPOSITION_FORMAT)], body))
}
