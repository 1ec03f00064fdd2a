//! Integration tests for the per-hub control plane.

mod helpers;

use reqwest::StatusCode;
use serde_json::{Value, json};

use helpers::TestApp;

#[tokio::test]
async fn test_online_counts_and_listing() {
    let app = TestApp::new().await;
    assert_eq!(app.online("main").await, 0);

    let _alice = app.connect_user("main", 1, "alice").await;
    let _bob = app.connect_user("main", 2, "bob").await;
    app.wait_online("main", 2).await;

    let (status, body) = app.rpc("main", "GetOnlineUsers", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let mut users: Vec<Value> = body["users"].as_array().unwrap().clone();
    users.sort_by_key(|u| u["id"].as_i64());
    assert_eq!(
        users,
        vec![
            json!({"id": 1, "username": "alice", "hardware_id": "hw-1"}),
            json!({"id": 2, "username": "bob", "hardware_id": "hw-2"}),
        ]
    );

    app.shutdown().await;
}

#[tokio::test]
async fn test_send_message_delivers_payload_verbatim() {
    let app = TestApp::new().await;
    let mut alice = app.connect_user("main", 1, "alice").await;
    app.wait_online("main", 1).await;

    let (status, body) = app
        .rpc(
            "main",
            "SendMessage",
            json!({"user_id": 1, "json_payload": {"kind": "notice", "n": 3}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let frame: Value = serde_json::from_str(&alice.next_frame().await.unwrap()).unwrap();
    assert_eq!(frame, json!({"kind": "notice", "n": 3}));

    app.shutdown().await;
}

#[tokio::test]
async fn test_send_message_to_absent_user_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app
        .rpc("main", "SendMessage", json!({"user_id": 99, "json_payload": {}}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"code": "not_found", "message": "User not connected"}));

    app.shutdown().await;
}

#[tokio::test]
async fn test_send_message_validates_input() {
    let app = TestApp::new().await;

    let (status, body) = app
        .rpc("main", "SendMessage", json!({"user_id": 0, "json_payload": {}}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["message"], "UserId is required");

    let (status, body) = app
        .rpc("main", "SendMessage", json!({"user_id": 4, "json_payload": null}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "JsonPayload is required");

    let (status, body) = app.rpc("main", "Broadcast", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");

    app.shutdown().await;
}

#[tokio::test]
async fn test_broadcast_reaches_every_session_of_the_hub_only() {
    let app = TestApp::with_hubs(&["main", "chat"]).await;
    let mut alice = app.connect_user("main", 1, "alice").await;
    let mut bob = app.connect_user("main", 2, "bob").await;
    let mut carol = app.connect_user("chat", 3, "carol").await;
    app.wait_online("main", 2).await;
    app.wait_online("chat", 1).await;

    let (status, _) = app
        .rpc("main", "Broadcast", json!({"json_payload": {"announce": true}}))
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(alice.next_frame().await.unwrap(), r#"{"announce":true}"#);
    assert_eq!(bob.next_frame().await.unwrap(), r#"{"announce":true}"#);

    // carol's next frame is the unicast, not the other hub's broadcast
    let (status, _) = app
        .rpc("chat", "SendMessage", json!({"user_id": 3, "json_payload": "direct"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(carol.next_frame().await.unwrap(), r#""direct""#);

    app.shutdown().await;
}

#[tokio::test]
async fn test_same_user_on_two_hubs_is_two_sessions() {
    let app = TestApp::with_hubs(&["main", "chat"]).await;
    let _main = app.connect_user("main", 1, "alice").await;
    let _chat = app.connect_user("chat", 1, "alice").await;

    app.wait_online("main", 1).await;
    app.wait_online("chat", 1).await;

    app.shutdown().await;
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new().await;
    let (status, _) = app.rpc("main", "GetOnline", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = http
        .get(app.http_url("/ping"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    app.shutdown().await;
}
