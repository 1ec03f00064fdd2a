//! Control service: the operations backend services invoke on one hub.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;
use relayhub_core::types::{Identity, UserId};

use crate::hub::Hub;

/// One entry of the online-users listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub id: UserId,
    pub username: String,
    pub hardware_id: String,
}

impl From<Identity> for OnlineUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id(),
            username: identity.username().to_string(),
            hardware_id: identity.hardware_id().to_string(),
        }
    }
}

/// Control operations bound to a single hub.
#[derive(Debug, Clone)]
pub struct ControlService {
    hub: Arc<Hub>,
}

impl ControlService {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn hub_name(&self) -> &str {
        self.hub.name()
    }

    /// Number of admitted connections.
    pub fn get_online(&self) -> i64 {
        self.hub.get_clients().len() as i64
    }

    /// Every admitted user, in no particular order.
    pub fn get_online_users(&self) -> Vec<OnlineUser> {
        self.hub
            .get_clients()
            .into_iter()
            .map(OnlineUser::from)
            .collect()
    }

    /// Deliver `payload` verbatim to the user's live connection.
    pub fn send_message(&self, user_id: UserId, payload: Option<Bytes>) -> AppResult<()> {
        if user_id <= 0 {
            return Err(AppError::validation("UserId is required"));
        }
        let payload = payload.ok_or_else(|| AppError::validation("JsonPayload is required"))?;

        if self.hub.send_to_user(user_id, payload) {
            Ok(())
        } else {
            debug!(hub = %self.hub.name(), user_id, "Unicast target not connected");
            Err(AppError::not_found("User not connected"))
        }
    }

    /// Deliver `payload` verbatim to every admitted connection.
    pub async fn broadcast(&self, payload: Option<Bytes>) -> AppResult<()> {
        let payload = payload.ok_or_else(|| AppError::validation("JsonPayload is required"))?;

        self.hub.broadcast(payload).await.map_err(|e| {
            error!(hub = %self.hub.name(), error = %e, "Broadcast rejected");
            AppError::internal(format!("Broadcast failed: {}", e.message))
        })
    }
}
