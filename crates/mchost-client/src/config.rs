//! Engine and transport configuration.
//!
//! All types deserialize from YAML with every field optional; durations are
//! given in milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default serial bit rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Bound on a single transport read, so the receive loop sees a stop request promptly.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Bound on a single transport write.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Protocol engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Name announced to the radio in the handshake.
    pub app_name: String,
    /// Deadline for the handshake reply.
    pub connect_timeout_ms: u64,
    /// Default deadline for a command reply.
    pub command_timeout_ms: u64,
    /// How long `close` waits for the receive loop before detaching it.
    pub join_timeout_ms: u64,
    /// Longest text chunk (in bytes) the message layer sends at once.
    pub message_chunk_limit: usize,
    /// Pause between consecutive chunks of one message.
    pub message_chunk_delay_ms: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        CompanionConfig {
            app_name: "mchost".to_string(),
            connect_timeout_ms: 5_000,
            command_timeout_ms: 3_000,
            join_timeout_ms: 1_000,
            message_chunk_limit: 150,
            message_chunk_delay_ms: 1_000,
        }
    }
}

impl CompanionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn message_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.message_chunk_delay_ms)
    }
}

/// Serial link settings. Framing is always 8N1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyACM0`.
    pub path: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            path: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// TCP link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// `host:port` of the radio's TCP bridge.
    pub address: String,
    pub connect_timeout_ms: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            address: String::new(),
            connect_timeout_ms: 5_000,
        }
    }
}

impl TcpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
