//! Integration tests for the WebSocket endpoint and hub sessions.

mod helpers;

use helpers::{TestApp, handshake_status};

const DISPLACED: &str = r#"{"type":"disconnect","subtype":"other_client","message":"You have been disconnected by another connection"}"#;

#[tokio::test]
async fn test_upgrade_without_token_is_unauthorized() {
    let app = TestApp::new().await;

    let err = app.connect_raw("main", None).await.err().expect("handshake should fail");
    assert_eq!(handshake_status(&err), Some(401));
    assert_eq!(app.online("main").await, 0);

    app.shutdown().await;
}

#[tokio::test]
async fn test_upgrade_with_invalid_token_is_unauthorized() {
    let app = TestApp::new().await;

    let err = app
        .connect_raw("main", Some("Bearer definitely.not.valid"))
        .await
        .err()
        .expect("handshake should fail");
    assert_eq!(handshake_status(&err), Some(401));

    app.shutdown().await;
}

#[tokio::test]
async fn test_unknown_hub_is_not_found() {
    let app = TestApp::new().await;
    let token = app.token(1, "alice");

    let err = app
        .connect_raw("nope", Some(&format!("Bearer {token}")))
        .await
        .err()
        .expect("handshake should fail");
    assert_eq!(handshake_status(&err), Some(404));

    app.shutdown().await;
}

#[tokio::test]
async fn test_token_prefix_is_optional() {
    let app = TestApp::new().await;

    for (id, prefix) in [(1, "Bearer "), (2, "Token "), (3, "")] {
        let token = app.token(id, "user");
        let mut client = app
            .connect_raw("main", Some(&format!("{prefix}{token}")))
            .await
            .expect("handshake should succeed");
        assert!(client.next_frame().await.unwrap().contains("Welcome!"));
    }
    app.wait_online("main", 3).await;

    app.shutdown().await;
}

#[tokio::test]
async fn test_welcome_frame_is_sent_first() {
    let app = TestApp::new().await;

    // connect_user asserts the welcome frame
    let _client = app.connect_user("main", 7, "alice").await;
    app.wait_online("main", 1).await;

    app.shutdown().await;
}

#[tokio::test]
async fn test_inbound_frames_are_echoed() {
    let app = TestApp::new().await;
    let mut client = app.connect_user("main", 7, "alice").await;

    client.send_text(r#"{"hello":"hub"}"#).await;
    assert_eq!(client.next_frame().await.unwrap(), r#"{"hello":"hub"}"#);

    app.shutdown().await;
}

#[tokio::test]
async fn test_second_session_displaces_first() {
    let app = TestApp::new().await;

    let mut first = app.connect_user("main", 42, "bob").await;
    app.wait_online("main", 1).await;

    let mut second = app.connect_user("main", 42, "bob").await;

    assert_eq!(first.next_frame().await.as_deref(), Some(DISPLACED));
    assert!(first.until_closed().await.is_empty());
    app.wait_online("main", 1).await;

    // The newer session is the one still admitted.
    let (status, _) = app
        .rpc(
            "main",
            "SendMessage",
            serde_json::json!({"user_id": 42, "json_payload": {"n": 1}}),
        )
        .await;
    assert!(status.is_success());
    assert_eq!(second.next_frame().await.unwrap(), r#"{"n":1}"#);

    app.shutdown().await;
}

#[tokio::test]
async fn test_oversized_message_closes_connection() {
    let app = TestApp::new().await;
    let mut client = app.connect_user("main", 5, "carol").await;
    app.wait_online("main", 1).await;

    client.send_text(&"x".repeat(4096)).await;
    client.until_closed().await;
    app.wait_online("main", 0).await;

    app.shutdown().await;
}

#[tokio::test]
async fn test_client_close_unregisters() {
    let app = TestApp::new().await;
    let client = app.connect_user("main", 8, "dave").await;
    app.wait_online("main", 1).await;

    client.close().await;
    app.wait_online("main", 0).await;

    app.shutdown().await;
}

#[tokio::test]
async fn test_ping_and_metrics() {
    let app = TestApp::new().await;
    let http = reqwest::Client::builder().no_proxy().build().unwrap();

    let pong = http.get(app.http_url("/ping")).send().await.unwrap();
    assert_eq!(pong.status(), reqwest::StatusCode::OK);
    assert_eq!(pong.text().await.unwrap(), "pong!");

    let _client = app.connect_user("main", 9, "erin").await;
    app.wait_online("main", 1).await;

    let metrics = http
        .get(app.http_url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains(r#"websocket_connections_total{hub="main"} 1"#));
    assert!(metrics.contains(r#"websocket_active_connections{hub="main"} 1"#));
    assert!(metrics.contains("api_request_duration_milliseconds"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let app = TestApp::new().await;
    let mut client = app.connect_user("main", 11, "frank").await;
    app.wait_online("main", 1).await;

    app.shutdown().await;
    assert!(client.until_closed().await.is_empty());
}
