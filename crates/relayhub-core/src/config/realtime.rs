//! Connection and hub tuning.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What the read pump does with inbound data frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundPolicy {
    /// Send every inbound frame back to the same client.
    Echo,
    /// Read and drop inbound frames.
    Discard,
}

impl FromStr for InboundPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "echo" => Ok(Self::Echo),
            "discard" => Ok(Self::Discard),
            other => Err(AppError::configuration(format!(
                "Unknown INBOUND_POLICY '{other}', expected 'echo' or 'discard'"
            ))),
        }
    }
}

/// Real-time connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound queue capacity per connection.
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Largest inbound message accepted, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Socket read buffer size, in bytes.
    #[serde(default = "default_buffer_size")]
    pub read_buffer_size: usize,
    /// Socket write buffer size, in bytes.
    #[serde(default = "default_buffer_size")]
    pub write_buffer_size: usize,
    /// Read deadline; reset on every pong and data frame.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Deadline for each frame write.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
    /// Delay between signalling a hub controller to stop and tearing
    /// down its sessions.
    #[serde(default = "default_stop_grace")]
    pub stop_grace_ms: u64,
    /// Inbound frame handling.
    #[serde(default = "default_inbound_policy")]
    pub inbound_policy: InboundPolicy,
}

impl RealtimeConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Nine tenths of the read timeout, so a ping always lands before the
    /// peer's deadline would expire.
    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms * 9 / 10)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_queue_capacity(),
            max_message_size: default_max_message_size(),
            read_buffer_size: default_buffer_size(),
            write_buffer_size: default_buffer_size(),
            read_timeout_ms: default_read_timeout(),
            write_timeout_ms: default_write_timeout(),
            stop_grace_ms: default_stop_grace(),
            inbound_policy: default_inbound_policy(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_message_size() -> usize {
    1024
}

fn default_buffer_size() -> usize {
    1024
}

fn default_read_timeout() -> u64 {
    10_000
}

fn default_write_timeout() -> u64 {
    5_000
}

fn default_stop_grace() -> u64 {
    100
}

fn default_inbound_policy() -> InboundPolicy {
    InboundPolicy::Echo
}
