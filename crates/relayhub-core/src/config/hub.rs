//! Hub list configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// A named hub and the port its control plane listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub name; also the last segment of `/websocket/<name>`.
    pub name: String,
    /// Control-plane listener port.
    pub control_port: u16,
}

/// Pair the comma-separated hub names with the comma-separated ports
/// by position.
pub fn parse_hubs(names: &str, ports: &str) -> AppResult<Vec<HubConfig>> {
    let names: Vec<&str> = names.split(',').map(str::trim).collect();
    let ports = ports
        .split(',')
        .map(str::trim)
        .map(|p| {
            p.parse::<u16>().map_err(|e| {
                AppError::configuration(format!("Invalid control port '{p}' in GRPC_SERVER_PORTS: {e}"))
            })
        })
        .collect::<AppResult<Vec<u16>>>()?;

    if names.len() != ports.len() {
        return Err(AppError::configuration(format!(
            "GRPC_SERVER_PORTS has {} entries but WEBSOCKET_HUBS has {}; they must match",
            ports.len(),
            names.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut hubs = Vec::with_capacity(names.len());
    for (name, control_port) in names.into_iter().zip(ports) {
        validate_hub_name(name)?;
        if !seen.insert(name) {
            return Err(AppError::configuration(format!(
                "Hub '{name}' is listed more than once in WEBSOCKET_HUBS"
            )));
        }
        hubs.push(HubConfig {
            name: name.to_string(),
            control_port,
        });
    }
    Ok(hubs)
}

fn validate_hub_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::configuration("Hub names must not be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::configuration(format!(
            "Hub name '{name}' may only contain ASCII letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}
