//! Route definitions for the public HTTP listener.
//!
//! The router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::Router;
use axum::routing::get;

use crate::error::panic_response;
use crate::handlers;
use crate::middleware::with_request_layers;
use crate::state::AppState;

/// Build the public router: probes, metrics and the WebSocket endpoint,
/// plus the debugger page in dev mode.
pub fn build_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let mut routes = Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/websocket/{hub}", get(handlers::ws::ws_upgrade));

    if state.config.logging.env_type.is_dev() {
        routes = routes.route(
            "/debug/websocket",
            get(handlers::debug::websocket_debugger),
        );
    }

    with_request_layers(routes.with_state(state), metrics, panic_response)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use relayhub_auth::{JwtEncoder, JwtValidator};
    use relayhub_core::config::AppConfig;
    use relayhub_core::types::Identity;
    use relayhub_realtime::metrics::error_type;
    use relayhub_realtime::{GatewayMetrics, RealtimeEngine};
    use tower::ServiceExt;

    fn state(env_type: &str) -> AppState {
        let vars = HashMap::from([
            ("JWT_SECRET".to_string(), "router-test-secret".to_string()),
            ("ENV_TYPE".to_string(), env_type.to_string()),
        ]);
        let config = AppConfig::from_env_map(vars).unwrap();
        let metrics = Arc::new(GatewayMetrics::new().unwrap());
        let engine = RealtimeEngine::new(
            config.realtime.clone(),
            config.hubs.iter().map(|h| h.name.as_str()),
            metrics.clone(),
        )
        .unwrap();
        AppState {
            validator: Arc::new(JwtValidator::new(&config.auth)),
            config: Arc::new(config),
            engine: Arc::new(engine),
            metrics,
        }
    }

    async fn get(router: Router, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::get(uri);
        if let Some(value) = auth {
            request = request.header("authorization", value);
        }
        let response = router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let (status, body) = get(build_router(state("dev")), "/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pong!");
    }

    #[tokio::test]
    async fn metrics_are_exposed_after_a_request() {
        let router = build_router(state("dev"));
        let _ = get(router.clone(), "/ping", None).await;
        let (status, body) = get(router, "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("api_request_duration_milliseconds"));
    }

    #[tokio::test]
    async fn upgrade_without_token_is_unauthorized() {
        let (status, body) = get(build_router(state("dev")), "/websocket/main", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "missing token");
    }

    #[tokio::test]
    async fn upgrade_with_bad_token_is_unauthorized() {
        let (status, _) = get(
            build_router(state("dev")),
            "/websocket/main",
            Some("Bearer not-a-jwt"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_without_upgrade_headers_is_rejected() {
        let state = state("dev");
        let encoder = JwtEncoder::new(&state.config.auth, chrono::Duration::minutes(5));
        let token = encoder.issue(&Identity::new(3, "carol", "hw-3")).unwrap();
        let hub_metrics = state.metrics.for_hub("main");

        let (status, _) = get(
            build_router(state),
            "/websocket/main",
            Some(&format!("Token {token}")),
        )
        .await;
        assert!(status.is_client_error());
        assert_ne!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(hub_metrics.errors(error_type::UPGRADE), 1);
        assert_eq!(hub_metrics.errors(error_type::AUTH), 0);
    }

    #[tokio::test]
    async fn unknown_hub_is_not_found() {
        let (status, _) = get(build_router(state("dev")), "/websocket/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn debugger_is_dev_only() {
        let (dev, _) = get(build_router(state("dev")), "/debug/websocket", None).await;
        let (prod, _) = get(build_router(state("prod")), "/debug/websocket", None).await;
        assert_eq!(dev, StatusCode::OK);
        assert_eq!(prod, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unmatched_paths_share_one_latency_series() {
        let router = build_router(state("dev"));
        for i in 0..5 {
            let (status, _) = get(router.clone(), &format!("/scan-{i}"), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let (_, body) = get(router, "/metrics", None).await;
        assert!(!body.contains("/scan-"));
        let unmatched: Vec<&str> = body
            .lines()
            .filter(|line| line.starts_with("api_request_duration_milliseconds_count"))
            .filter(|line| line.contains(r#"endpoint="unmatched""#))
            .collect();
        assert_eq!(unmatched.len(), 1);
        assert!(unmatched[0].ends_with(" 5"));
    }
}
