//! Error types for mei-bridge

use thiserror::Error;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// I/O error (network, file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Message record could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Leading type tag is not one this bridge handles
    #[error("Unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),

    /// Buffer shorter than the fixed portion of the record
    #[error("Truncated {message} message: need {needed} bytes, have {actual}")]
    Truncated {
        message: &'static str,
        needed: usize,
        actual: usize,
    },

    /// Host socket could not be established
    #[error("Failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Every local channel identifier is in use
    #[error("Channel identifier space exhausted")]
    ChannelIdsExhausted,

    /// A live channel already uses this peer identifier
    #[error("Channel for connection {0} already exists")]
    DuplicateChannel(u32),

    /// Identity cache rejected an update
    #[error("Identity update failed: {0}")]
    Identity(String),
}

/// Result type alias for BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<serde_yaml::Error> for BridgeError {
    fn from(err: serde_yaml::Error) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Identity(err.to_string())
    }
}
