//! Configuration loader

use super::Config;
use crate::error::{BridgeError, Result};
use std::path::Path;

/// Load configuration from a YAML file
///
/// Also applies MEI_BRIDGE_* env var overrides after loading.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Load configuration from a YAML string (useful for testing)
///
/// An empty document yields the default configuration.
pub fn load_config_from_str(yaml: &str) -> Result<Config> {
    let mut config: Config = if yaml.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    apply_env_overrides(&mut config);
    config.validate().map_err(BridgeError::Config)?;
    Ok(config)
}

/// Apply MEI_BRIDGE_* environment variable overrides to a config.
///
/// Supported env vars:
/// - `MEI_BRIDGE_LISTEN_ADDRESS` - Override ingress listen address
/// - `MEI_BRIDGE_LISTEN_PORT` - Override ingress listen port
/// - `MEI_BRIDGE_LOG_LEVEL` - Override log level
/// - `MEI_BRIDGE_CONNECT_TIMEOUT_SECS` - Override host connect timeout
/// - `MEI_BRIDGE_SEND_TIMEOUT_SECS` - Override host write timeout
/// - `MEI_BRIDGE_INITIAL_TX_WINDOW` - Override the per-channel initial credit
/// - `MEI_BRIDGE_MAX_CHANNEL_ID` - Override the local channel id space
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("MEI_BRIDGE_LISTEN_ADDRESS") {
        debug!("Overriding listen_address from MEI_BRIDGE_LISTEN_ADDRESS");
        config.ingress.listen_address = val;
    }
    if let Some(val) = lookup("MEI_BRIDGE_LISTEN_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            debug!("Overriding listen_port from MEI_BRIDGE_LISTEN_PORT");
            config.ingress.listen_port = port;
        }
    }
    if let Some(val) = lookup("MEI_BRIDGE_LOG_LEVEL") {
        debug!("Overriding log level from MEI_BRIDGE_LOG_LEVEL");
        config.logging.level = val;
    }
    if let Some(val) = lookup("MEI_BRIDGE_CONNECT_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse::<u64>() {
            debug!("Overriding connect_timeout from MEI_BRIDGE_CONNECT_TIMEOUT_SECS");
            config.transport.connect_timeout_secs = secs;
        }
    }
    if let Some(val) = lookup("MEI_BRIDGE_SEND_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse::<u64>() {
            debug!("Overriding send_timeout from MEI_BRIDGE_SEND_TIMEOUT_SECS");
            config.transport.send_timeout_secs = secs;
        }
    }
    if let Some(val) = lookup("MEI_BRIDGE_INITIAL_TX_WINDOW") {
        if let Ok(window) = val.parse::<u32>() {
            debug!("Overriding initial_tx_window from MEI_BRIDGE_INITIAL_TX_WINDOW");
            config.channels.initial_tx_window = window;
        }
    }
    if let Some(val) = lookup("MEI_BRIDGE_MAX_CHANNEL_ID") {
        if let Ok(max) = val.parse::<u32>() {
            debug!("Overriding max_channel_id from MEI_BRIDGE_MAX_CHANNEL_ID");
            config.channels.max_channel_id = max;
        }
    }
}
