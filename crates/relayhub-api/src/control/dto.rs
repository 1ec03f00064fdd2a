//! Request and response bodies of the control RPCs.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use validator::Validate;

use relayhub_core::types::UserId;
use relayhub_realtime::OnlineUser;

/// Body of requests and responses that carry nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOnlineResponse {
    pub online: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOnlineUsersResponse {
    pub users: Vec<OnlineUser>,
}

/// Unicast request. `json_payload` is forwarded to the client byte for
/// byte; `null` or absent counts as missing.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(default)]
    #[validate(range(min = 1, message = "UserId is required"))]
    pub user_id: UserId,
    #[serde(default)]
    #[validate(required(message = "JsonPayload is required"))]
    pub json_payload: Option<Box<RawValue>>,
}

impl SendMessageRequest {
    pub fn payload(&self) -> Option<Bytes> {
        raw_bytes(self.json_payload.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[serde(default)]
    #[validate(required(message = "JsonPayload is required"))]
    pub json_payload: Option<Box<RawValue>>,
}

impl BroadcastRequest {
    pub fn payload(&self) -> Option<Bytes> {
        raw_bytes(self.json_payload.as_deref())
    }
}

fn raw_bytes(raw: Option<&RawValue>) -> Option<Bytes> {
    raw.map(|value| Bytes::copy_from_slice(value.get().as_bytes()))
}
