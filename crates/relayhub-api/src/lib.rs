//! # relayhub-api
//!
//! HTTP surface for RelayHub:
//!
//! - the public router (`/ping`, `/metrics`, `/websocket/{hub}` and the
//!   dev-only `/debug/websocket` page)
//! - one control RPC router per hub, served on that hub's control port
//! - [`Gateway`], which binds every listener and coordinates shutdown

pub mod app;
pub mod control;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::Gateway;
pub use error::ApiError;
pub use state::AppState;
