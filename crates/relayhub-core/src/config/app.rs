//! HTTP server configuration.

use serde::{Deserialize, Serialize};

/// Public HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port for `/ping`, `/metrics` and the WebSocket endpoints.
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` form suitable for a TCP bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
