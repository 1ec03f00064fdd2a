//! Logging configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvType {
    /// Human-readable logs, debug page enabled.
    Dev,
    /// Structured JSON logs.
    Prod,
}

impl EnvType {
    pub fn is_dev(self) -> bool {
        self == Self::Dev
    }
}

impl fmt::Display for EnvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for EnvType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(AppError::configuration(format!(
                "Unknown ENV_TYPE '{other}', expected 'dev' or 'prod'"
            ))),
        }
    }
}

/// Logging and log-shipping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub env_type: EnvType,
    /// Lowers the default level from `info` to `debug`.
    pub debug: bool,
    /// Log-shipping endpoint, recorded on the root span.
    pub shipping_url: String,
    /// Raw JSON object of static labels.
    pub labels: String,
}

impl LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub fn level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    /// Parse the static labels. An empty value yields no labels.
    pub fn parsed_labels(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        if self.labels.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(labels: &str) -> LoggingConfig {
        LoggingConfig {
            env_type: EnvType::Dev,
            debug: false,
            shipping_url: String::new(),
            labels: labels.to_string(),
        }
    }

    #[test]
    fn labels_parse_as_string_map() {
        let labels = logging(r#"{"service":"relay","team":"rt"}"#)
            .parsed_labels()
            .unwrap();
        assert_eq!(labels.get("service").map(String::as_str), Some("relay"));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn empty_labels_are_allowed() {
        assert!(logging("  ").parsed_labels().unwrap().is_empty());
    }

    #[test]
    fn malformed_labels_error() {
        assert!(logging("service=relay").parsed_labels().is_err());
    }

    #[test]
    fn debug_flag_lowers_level() {
        let mut config = logging("");
        assert_eq!(config.level(), "info");
        config.debug = true;
        assert_eq!(config.level(), "debug");
    }
}
