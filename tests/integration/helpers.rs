//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use relayhub_api::Gateway;
use relayhub_auth::{JwtEncoder, JwtValidator};
use relayhub_core::config::AppConfig;
use relayhub_core::types::Identity;

pub const SECRET: &str = "integration-test-secret";
pub const ISSUER: &str = "relayhub-tests";

/// How long any single wait in a test may take.
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// A gateway running on ephemeral ports.
pub struct TestApp {
    gateway: Gateway,
    encoder: JwtEncoder,
    http: reqwest::Client,
}

impl TestApp {
    /// Start a gateway with a single `main` hub.
    pub async fn new() -> Self {
        Self::with_hubs(&["main"]).await
    }

    pub async fn with_hubs(hubs: &[&str]) -> Self {
        let vars: HashMap<String, String> = [
            ("JWT_SECRET", SECRET.to_string()),
            ("JWT_ISSUER", ISSUER.to_string()),
            ("HTTP_HOST", "127.0.0.1".to_string()),
            ("HTTP_PORT", "0".to_string()),
            ("WEBSOCKET_HUBS", hubs.join(",")),
            ("GRPC_SERVER_PORTS", vec!["0"; hubs.len()].join(",")),
            ("ENV_TYPE", "dev".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let config = AppConfig::from_env_map(vars).expect("Failed to build test config");
        let encoder = JwtEncoder::new(&config.auth, chrono::Duration::minutes(5));
        let validator = Arc::new(JwtValidator::new(&config.auth));
        let gateway = Gateway::start(config, validator)
            .await
            .expect("Failed to start gateway");
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            gateway,
            encoder,
            http,
        }
    }

    pub fn token(&self, id: i64, username: &str) -> String {
        self.encoder
            .issue(&Identity::new(id, username, format!("hw-{id}")))
            .expect("Failed to issue token")
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.gateway.http_addr(), path)
    }

    /// Open a WebSocket to `hub`, sending `authorization` verbatim when given.
    pub async fn connect_raw(
        &self,
        hub: &str,
        authorization: Option<&str>,
    ) -> Result<WsClient, tungstenite::Error> {
        let url = format!("ws://{}/websocket/{}", self.gateway.http_addr(), hub);
        let mut request = url.into_client_request()?;
        if let Some(value) = authorization {
            request.headers_mut().insert(
                "authorization",
                HeaderValue::from_str(value).expect("invalid header value"),
            );
        }
        let (stream, _) = connect_async(request).await?;
        Ok(WsClient {
            stream,
            pending: VecDeque::new(),
        })
    }

    /// Connect as user `id` and consume the welcome frame.
    pub async fn connect_user(&self, hub: &str, id: i64, username: &str) -> WsClient {
        let token = self.token(id, username);
        let mut client = self
            .connect_raw(hub, Some(&format!("Bearer {token}")))
            .await
            .expect("WebSocket handshake failed");
        let welcome = client.next_frame().await.expect("no welcome frame");
        assert_eq!(
            serde_json::from_str::<Value>(&welcome).unwrap(),
            serde_json::json!({"message": "Welcome!", "user": username})
        );
        client
    }

    /// Call a control RPC on `hub`.
    pub async fn rpc(&self, hub: &str, operation: &str, body: Value) -> (StatusCode, Value) {
        let addr = self
            .gateway
            .control_addr(hub)
            .unwrap_or_else(|| panic!("no control listener for hub {hub}"));
        let response = self
            .http
            .post(format!("http://{addr}/rpc/{operation}"))
            .json(&body)
            .send()
            .await
            .expect("RPC request failed");
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn online(&self, hub: &str) -> i64 {
        let (status, body) = self.rpc(hub, "GetOnline", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        body["online"].as_i64().expect("online count missing")
    }

    /// Poll until the hub reports `expected` online users.
    pub async fn wait_online(&self, hub: &str, expected: i64) {
        let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
        loop {
            let online = self.online(hub).await;
            if online == expected {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "hub {hub} stayed at {online} online, expected {expected}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn shutdown(self) {
        self.gateway.shutdown(Duration::from_secs(2)).await;
    }
}

/// WebSocket client that splits coalesced text frames on `\n`.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<String>,
}

impl WsClient {
    /// Next logical frame, or `None` once the server closed the socket.
    pub async fn next_frame(&mut self) -> Option<String> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(frame);
            }
            let next = tokio::time::timeout(STEP_TIMEOUT, self.stream.next())
                .await
                .expect("timed out waiting for a frame");
            match next {
                None | Some(Err(_)) => return None,
                Some(Ok(Message::Close(_))) => return None,
                Some(Ok(Message::Text(text))) => {
                    self.pending
                        .extend(text.as_str().split('\n').map(str::to_string));
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    self.pending.extend(text.split('\n').map(str::to_string));
                }
                Some(Ok(_)) => {}
            }
        }
    }

    /// Drain until the server closes, returning any frames seen on the way.
    pub async fn until_closed(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame().await {
            frames.push(frame);
        }
        frames
    }

    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .expect("failed to send frame");
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// HTTP status of a failed handshake.
pub fn handshake_status(err: &tungstenite::Error) -> Option<u16> {
    match err {
        tungstenite::Error::Http(response) => Some(response.status().as_u16()),
        _ => None,
    }
}
