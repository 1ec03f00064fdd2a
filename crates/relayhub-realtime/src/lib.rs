//! # relayhub-realtime
//!
//! Real-time engine for RelayHub. Provides:
//!
//! - Per-client connections with a bounded outbound queue and a pair of
//!   read/write pumps bridging the socket
//! - Named hubs that keep at most one live connection per user and fan
//!   frames out to one user or to everyone
//! - The control service backing the per-hub RPC surface
//! - Prometheus metrics for connections, deliveries and errors

pub mod connection;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod server;
pub mod service;

pub use connection::{Connection, ConnectionId};
pub use hub::Hub;
pub use metrics::{GatewayMetrics, HubMetrics};
pub use server::RealtimeEngine;
pub use service::{ControlService, OnlineUser};
