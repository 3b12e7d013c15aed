//! Configuration module for mei-bridge
//!
//! Every section is optional; an empty document yields the defaults.
//!
//! ```yaml
//! channels:
//!   initial_tx_window: 1024
//!   max_channel_id: 4294967294
//! transport:
//!   connect_timeout_secs: 30
//!   send_timeout_secs: 10
//!   tcp_nodelay: true
//! ingress:
//!   listen_address: "127.0.0.1"
//!   listen_port: 16994
//!   max_message_len: 65536
//! logging:
//!   level: info
//!   protocol_debug: false
//! ```

mod loader;
mod types;

pub use loader::{apply_env_overrides, load_config, load_config_from_str};
pub use types::*;
