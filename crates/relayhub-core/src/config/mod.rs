//! Application configuration.
//!
//! Settings come from an optional `config/relayhub.*` file overlaid by
//! process environment variables (`HTTP_PORT`, `WEBSOCKET_HUBS`, ...).
//! The flat key set is deserialized into [`Settings`] and then validated
//! into the sectioned [`AppConfig`] the rest of the gateway consumes.

pub mod app;
pub mod auth;
pub mod hub;
pub mod logging;
pub mod realtime;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::AuthConfig;
pub use self::hub::HubConfig;
pub use self::logging::{EnvType, LoggingConfig};
pub use self::realtime::{InboundPolicy, RealtimeConfig};

use crate::error::AppError;
use crate::result::AppResult;

/// Optional configuration file, looked up relative to the working directory.
pub const CONFIG_FILE: &str = "config/relayhub";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Token verification settings.
    pub auth: AuthConfig,
    /// Hubs to create, each paired with its control-plane port.
    pub hubs: Vec<HubConfig>,
    /// Connection and hub tuning.
    pub realtime: RealtimeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Flat key set as it appears in the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_grpc_server_ports")]
    pub grpc_server_ports: String,
    #[serde(default = "default_websocket_hubs")]
    pub websocket_hubs: String,
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "default_env_type")]
    pub env_type: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_loki_endpoint_url")]
    pub loki_endpoint_url: String,
    #[serde(default)]
    pub loki_labels: String,
    #[serde(default = "default_inbound_policy")]
    pub inbound_policy: String,
}

impl AppConfig {
    /// Load configuration from the optional file and the process environment.
    pub fn load() -> AppResult<Self> {
        Self::build(config::Environment::default())
    }

    /// Load configuration from an explicit key/value map instead of the
    /// process environment. Keys use the environment spelling.
    pub fn from_env_map(vars: HashMap<String, String>) -> AppResult<Self> {
        Self::build(config::Environment::default().source(Some(vars)))
    }

    fn build(environment: config::Environment) -> AppResult<Self> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(environment)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        Self::from_settings(settings)
    }

    /// Validate a flat key set into the sectioned configuration.
    pub fn from_settings(settings: Settings) -> AppResult<Self> {
        if settings.jwt_secret.trim().is_empty() {
            return Err(AppError::configuration("JWT_SECRET is required"));
        }

        let hubs = hub::parse_hubs(&settings.websocket_hubs, &settings.grpc_server_ports)?;
        let env_type: EnvType = settings.env_type.parse()?;
        let inbound_policy: InboundPolicy = settings.inbound_policy.parse()?;

        Ok(Self {
            server: ServerConfig {
                host: settings.http_host,
                port: settings.http_port,
            },
            auth: AuthConfig {
                jwt_secret: settings.jwt_secret,
                jwt_issuer: settings.jwt_issuer,
                leeway_seconds: 0,
            },
            hubs,
            realtime: RealtimeConfig {
                inbound_policy,
                ..RealtimeConfig::default()
            },
            logging: LoggingConfig {
                env_type,
                debug: settings.debug,
                shipping_url: settings.loki_endpoint_url,
                labels: settings.loki_labels,
            },
        })
    }
}

fn default_http_port() -> u16 {
    8090
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_server_ports() -> String {
    "50051".to_string()
}

fn default_websocket_hubs() -> String {
    "main".to_string()
}

fn default_jwt_issuer() -> String {
    "issuer".to_string()
}

fn default_env_type() -> String {
    "dev".to_string()
}

fn default_loki_endpoint_url() -> String {
    "http://localhost:3100/loki/api/v1/push".to_string()
}

fn default_inbound_policy() -> String {
    "echo".to_string()
}
