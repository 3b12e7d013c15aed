//! mei-bridge - channel multiplexing between a management engine and host sockets
//!
//! This library provides the core of a bridge that:
//! - Decodes the engine's connection-control and data messages
//! - Opens, feeds and closes host TCP/UDP sockets on the engine's behalf
//! - Keeps a bidirectional registry of live channels shared with the socket event loop
//! - Records the host FQDN announced by the engine
//!
//! The entry point is [`ProtocolDispatcher::handle`], which consumes one
//! complete message and reports a [`DispatchStatus`].

#[macro_use]
mod logging;

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod ingress;
pub mod logger;
pub mod metrics;
pub mod mock;
pub mod notifier;
pub mod protocol;
pub mod transport;

pub use channel::{
    Channel, ChannelRegistry, ChannelStatus, LocalChannelId, PeerChannelId, RegistryHandle,
    ILLEGAL_CHANNEL_ID,
};
pub use config::Config;
pub use dispatcher::{DispatchStatus, ProtocolDispatcher};
pub use error::{BridgeError, Result};
pub use identity::{FqdnCache, IdentityCache};
pub use ingress::IngressListener;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use notifier::{EventLoopNotifier, Notifier};
pub use transport::{ConnectTarget, HostSocket, SocketTransport, TokioSocketTransport};

#[cfg(test)]
mod tests;
