//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocket;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tracing::{debug, info, warn};

use relayhub_core::error::AppError;
use relayhub_core::types::Identity;
use relayhub_realtime::Hub;
use relayhub_realtime::connection::{PumpSettings, read_pump, write_pump};
use relayhub_realtime::message::welcome_frame;
use relayhub_realtime::metrics::error_type;

use crate::error::ApiError;
use crate::extractors::ConnectionToken;
use crate::state::AppState;

/// GET /websocket/{hub}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Path(hub_name): Path<String>,
    ConnectionToken(token): ConnectionToken,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let hub = state
        .engine
        .hub(&hub_name)
        .ok_or_else(|| AppError::not_found(format!("Hub '{hub_name}' not found")))?;

    let Some(token) = token else {
        hub.metrics().error(error_type::AUTH);
        return Err(AppError::authentication("missing token").into());
    };

    let identity = match state.validator.validate(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            debug!(hub = %hub_name, error = %e, "Upgrade rejected");
            hub.metrics().error(error_type::AUTH);
            return Err(e.into());
        }
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            hub.metrics().error(error_type::UPGRADE);
            return Ok(rejection.into_response());
        }
    };

    let config = state.engine.config();
    let settings = PumpSettings::from(config);
    let failed_hub = hub.clone();

    Ok(upgrade
        .read_buffer_size(config.read_buffer_size)
        .write_buffer_size(config.write_buffer_size)
        .max_message_size(config.max_message_size)
        .max_frame_size(config.max_message_size)
        .on_failed_upgrade(move |e| {
            warn!(hub = %failed_hub.name(), error = %e, "WebSocket upgrade failed");
            failed_hub.metrics().error(error_type::UPGRADE);
        })
        .on_upgrade(move |socket| run_session(hub, identity, settings, socket)))
}

/// Admit the upgraded socket into `hub` and start its pumps.
async fn run_session(hub: Arc<Hub>, identity: Identity, settings: PumpSettings, socket: WebSocket) {
    let (conn, outbound) = hub.connect(identity);

    if let Err(e) = hub.register(conn.clone()).await {
        warn!(hub = %hub.name(), conn_id = %conn.id(), error = %e, "Registration refused");
        return;
    }

    match welcome_frame(conn.identity().username()) {
        Ok(frame) => {
            if let Err(e) = conn.try_enqueue(frame) {
                debug!(conn_id = %conn.id(), error = ?e, "Welcome frame not queued");
            }
        }
        Err(e) => warn!(conn_id = %conn.id(), error = %e, "Failed to build welcome frame"),
    }

    info!(
        hub = %hub.name(),
        conn_id = %conn.id(),
        user_id = conn.user_id(),
        "WebSocket connection established"
    );

    let (sink, stream) = socket.split();
    tokio::spawn(write_pump(conn.clone(), sink, outbound, settings.clone()));
    tokio::spawn(async move {
        let conn_id = conn.id();
        let user_id = conn.user_id();
        let exit = read_pump(conn, stream, settings).await;
        info!(conn_id = %conn_id, user_id, reason = ?exit, "WebSocket connection closed");
    });
}
