//! Typed client for one hub's control listener.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use relayhub_api::control::dto::{
    BroadcastRequest, Empty, GetOnlineResponse, GetOnlineUsersResponse, SendMessageRequest,
};
use relayhub_api::control::{RpcCode, RpcError};
use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;
use relayhub_core::types::UserId;
use relayhub_realtime::OnlineUser;

pub struct ControlClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlClient {
    /// `addr` is `host:port`, optionally with an `http://` prefix.
    pub fn new(addr: &str) -> Self {
        let addr = addr.trim_end_matches('/');
        let base_url = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        };
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn get_online(&self) -> AppResult<i64> {
        let response: GetOnlineResponse = self.call("GetOnline", &Empty {}).await?;
        Ok(response.online)
    }

    pub async fn get_online_users(&self) -> AppResult<Vec<OnlineUser>> {
        let response: GetOnlineUsersResponse = self.call("GetOnlineUsers", &Empty {}).await?;
        Ok(response.users)
    }

    pub async fn send_message(&self, user_id: UserId, payload: Box<RawValue>) -> AppResult<()> {
        let request = SendMessageRequest {
            user_id,
            json_payload: Some(payload),
        };
        let _: Empty = self.call("SendMessage", &request).await?;
        Ok(())
    }

    pub async fn broadcast(&self, payload: Box<RawValue>) -> AppResult<()> {
        let request = BroadcastRequest {
            json_payload: Some(payload),
        };
        let _: Empty = self.call("Broadcast", &request).await?;
        Ok(())
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> AppResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/rpc/{}", self.base_url, operation);
        tracing::debug!(url = %url, "Calling control plane");

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            AppError::service_unavailable(format!("Control plane unreachable at {url}: {e}"))
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::internal(format!("Failed to read response: {e}")))?;

        if status == StatusCode::OK {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        match serde_json::from_slice::<RpcError>(&bytes) {
            Ok(rpc) => Err(rpc_to_app_error(rpc)),
            Err(_) => Err(AppError::internal(format!(
                "{operation} failed with HTTP {status}"
            ))),
        }
    }
}

fn rpc_to_app_error(err: RpcError) -> AppError {
    match err.code {
        RpcCode::InvalidArgument => AppError::validation(err.message),
        RpcCode::NotFound => AppError::not_found(err.message),
        RpcCode::Internal => AppError::internal(err.message),
    }
}

/// Parse a command-line payload as JSON, keeping its exact text.
pub fn parse_payload(text: &str) -> AppResult<Box<RawValue>> {
    RawValue::from_string(text.to_string())
        .map_err(|e| AppError::validation(format!("Payload is not valid JSON: {e}")))
}
