//! Control RPC handlers. Each one delegates to the hub's
//! [`ControlService`].

use axum::Json;
use axum::extract::State;

use relayhub_realtime::ControlService;

use super::dto::{
    BroadcastRequest, Empty, GetOnlineResponse, GetOnlineUsersResponse, SendMessageRequest,
};
use super::error::RpcError;
use super::extract::ValidatedRpcJson;

/// POST /rpc/GetOnline
pub async fn get_online(State(service): State<ControlService>) -> Json<GetOnlineResponse> {
    Json(GetOnlineResponse {
        online: service.get_online(),
    })
}

/// POST /rpc/GetOnlineUsers
pub async fn get_online_users(
    State(service): State<ControlService>,
) -> Json<GetOnlineUsersResponse> {
    Json(GetOnlineUsersResponse {
        users: service.get_online_users(),
    })
}

/// POST /rpc/SendMessage
pub async fn send_message(
    State(service): State<ControlService>,
    ValidatedRpcJson(request): ValidatedRpcJson<SendMessageRequest>,
) -> Result<Json<Empty>, RpcError> {
    service.send_message(request.user_id, request.payload())?;
    Ok(Json(Empty {}))
}

/// POST /rpc/Broadcast
pub async fn broadcast(
    State(service): State<ControlService>,
    ValidatedRpcJson(request): ValidatedRpcJson<BroadcastRequest>,
) -> Result<Json<Empty>, RpcError> {
    service.broadcast(request.payload()).await?;
    Ok(Json(Empty {}))
}
