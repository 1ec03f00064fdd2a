//! Developer tooling, only routed when `ENV_TYPE=dev`.

use axum::response::Html;

/// GET /debug/websocket
pub async fn websocket_debugger() -> Html<&'static str> {
    Html(include_str!("../../static/websocket_debugger.html"))
}
