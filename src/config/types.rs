//! Configuration types

use serde::Deserialize;
use std::time::Duration;

use crate::channel::ILLEGAL_CHANNEL_ID;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Channel registry and flow-control settings
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Host socket settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Management-interface listener settings (binary only)
    #[serde(default)]
    pub ingress: IngressConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.channels.max_channel_id == 0 {
            return Err("channels.max_channel_id must be at least 1".to_string());
        }
        if self.channels.max_channel_id >= ILLEGAL_CHANNEL_ID {
            return Err(format!(
                "channels.max_channel_id must be below the reserved id {}",
                ILLEGAL_CHANNEL_ID
            ));
        }
        if self.channels.initial_tx_window == 0 {
            return Err("channels.initial_tx_window must be non-zero".to_string());
        }
        if self.transport.connect_timeout_secs == 0 {
            return Err("transport.connect_timeout_secs must be non-zero".to_string());
        }
        if self.transport.send_timeout_secs == 0 {
            return Err("transport.send_timeout_secs must be non-zero".to_string());
        }
        if self.ingress.max_message_len == 0 {
            return Err("ingress.max_message_len must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Channel registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Byte credit granted to a channel when it opens
    #[serde(default = "default_initial_tx_window")]
    pub initial_tx_window: u32,
    /// Highest local channel id handed out before wrapping back to 1
    #[serde(default = "default_max_channel_id")]
    pub max_channel_id: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            initial_tx_window: default_initial_tx_window(),
            max_channel_id: default_max_channel_id(),
        }
    }
}

/// Host socket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound on one write to a host socket, in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// Disable Nagle's algorithm on stream sockets
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            send_timeout_secs: default_send_timeout(),
            tcp_nodelay: true,
        }
    }
}

/// Management-interface listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngressConfig {
    /// Address to listen on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Port to listen on
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Largest message accepted in one frame
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            max_message_len: default_max_message_len(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to log decoded message details
    #[serde(default)]
    pub protocol_debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            protocol_debug: false,
        }
    }
}

fn default_initial_tx_window() -> u32 {
    1024
}

fn default_max_channel_id() -> u32 {
    ILLEGAL_CHANNEL_ID - 1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_send_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    16994
}

fn default_max_message_len() -> usize {
    64 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}
