//! Protocol dispatcher: turns engine messages into socket operations.
//!
//! [`ProtocolDispatcher::handle`] decodes one complete message, routes it by
//! type tag and reports a [`DispatchStatus`]. No error ever crosses this
//! boundary; every failure is resolved here into `Reject` plus whatever
//! channel teardown it implies.

use std::sync::Arc;

use crate::channel::{Channel, ChannelRegistry, RegistrationError, RegistryHandle};
use crate::config::{ChannelConfig, Config};
use crate::error::BridgeError;
use crate::identity::IdentityCache;
use crate::metrics::BridgeMetrics;
use crate::notifier::Notifier;
use crate::protocol::{
    decode_message, CloseConnection, IpFqdn, Message, OpenConnectionEx, SendData,
};
use crate::transport::{AddressFamily, ConnectTarget, SendFailure, SocketTransport};

/// Outcome reported back to the message-receipt layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DispatchStatus {
    Ok,
    Reject,
}

impl DispatchStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DispatchStatus::Ok)
    }

    /// Single-byte wire form: 0 = ok, 1 = reject.
    pub fn as_byte(&self) -> u8 {
        match self {
            DispatchStatus::Ok => 0,
            DispatchStatus::Reject => 1,
        }
    }
}

pub struct ProtocolDispatcher<T: SocketTransport, N: Notifier> {
    registry: RegistryHandle<T::Socket>,
    transport: Arc<T>,
    notifier: N,
    identity: Arc<dyn IdentityCache>,
    channels: ChannelConfig,
    metrics: Arc<BridgeMetrics>,
    protocol_debug: bool,
}

impl<T, N> ProtocolDispatcher<T, N>
where
    T: SocketTransport,
    N: Notifier,
{
    /// Build a dispatcher with a fresh registry sized from `config`.
    pub fn new(
        config: &Config,
        transport: Arc<T>,
        notifier: N,
        identity: Arc<dyn IdentityCache>,
    ) -> Self {
        let registry = ChannelRegistry::shared(config.channels.max_channel_id);
        let mut dispatcher =
            Self::with_registry(registry, config.channels.clone(), transport, notifier, identity);
        dispatcher.protocol_debug = config.logging.protocol_debug;
        dispatcher
    }

    /// Build a dispatcher around a registry that is also handed to the
    /// socket event loop.
    pub fn with_registry(
        registry: RegistryHandle<T::Socket>,
        channels: ChannelConfig,
        transport: Arc<T>,
        notifier: N,
        identity: Arc<dyn IdentityCache>,
    ) -> Self {
        Self {
            registry,
            transport,
            notifier,
            identity,
            channels,
            metrics: Arc::new(BridgeMetrics::new()),
            protocol_debug: false,
        }
    }

    pub fn registry(&self) -> RegistryHandle<T::Socket> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle one complete inbound message.
    pub async fn handle(&self, buffer: &[u8]) -> DispatchStatus {
        BridgeMetrics::incr(&self.metrics.messages_received);
        trace!(
            "Received {} bytes (msg type 0x{:02x})",
            buffer.len(),
            buffer.first().copied().unwrap_or_default()
        );

        let status = match decode_message(buffer) {
            Ok(message) => {
                if self.protocol_debug {
                    debug!("Decoded {:?}", message);
                }
                self.dispatch(message).await
            }
            Err(e) => {
                warn!("Dropping malformed message: {}", e);
                BridgeMetrics::incr(&self.metrics.malformed_messages);
                DispatchStatus::Reject
            }
        };

        if status == DispatchStatus::Reject {
            BridgeMetrics::incr(&self.metrics.messages_rejected);
        }
        status
    }

    async fn dispatch(&self, message: Message<'_>) -> DispatchStatus {
        match message {
            Message::OpenConnectionEx(msg) => self.handle_open(msg).await,
            Message::CloseConnection(msg) => self.handle_close(msg).await,
            Message::SendData(msg) => self.handle_send(msg).await,
            Message::IpFqdn(msg) => self.handle_ip_fqdn(msg).await,
        }
    }

    async fn handle_open(&self, msg: OpenConnectionEx) -> DispatchStatus {
        let peer_id = msg.connection_id;
        let target = ConnectTarget {
            host: msg.host.destination(),
            port: msg.port,
            family: AddressFamily::Ipv4,
            kind: msg.protocol_kind().into(),
        };
        info!("Connection request {} for {}", peer_id, target);

        if self.registry.contains_peer(peer_id).await {
            warn!("{}", BridgeError::DuplicateChannel(peer_id));
            BridgeMetrics::incr(&self.metrics.duplicate_opens);
            return DispatchStatus::Reject;
        }

        // Connect before taking the lock; resolution and handshake latency
        // must not stall the other registry users.
        let socket = match self.transport.connect(&target).await {
            Ok(socket) => socket,
            Err(source) => {
                let err = BridgeError::Connect {
                    host: target.host.clone(),
                    port: target.port,
                    source,
                };
                warn!("Connection request {} failed: {}", peer_id, err);
                BridgeMetrics::incr(&self.metrics.connect_failures);
                return DispatchStatus::Reject;
            }
        };

        let mut channel = Channel::new(socket, peer_id, target);
        channel.open(self.channels.initial_tx_window);

        let registered = self.registry.lock().await.register(channel);
        match registered {
            Ok(local_id) => {
                info!(
                    "Channel {} opened for connection {} (tx window {})",
                    local_id, peer_id, self.channels.initial_tx_window
                );
                BridgeMetrics::incr(&self.metrics.channels_opened);
                self.notifier.signal();
                DispatchStatus::Ok
            }
            Err(RegistrationError { reason, channel }) => {
                match reason {
                    BridgeError::ChannelIdsExhausted => {
                        error!(
                            "Unable to allocate a new channel for connection {}: {}",
                            peer_id, reason
                        );
                        BridgeMetrics::incr(&self.metrics.channel_id_exhaustions);
                    }
                    other => {
                        warn!("Connection request {} not registered: {}", peer_id, other);
                        BridgeMetrics::incr(&self.metrics.duplicate_opens);
                    }
                }
                self.transport.close(channel.close()).await;
                DispatchStatus::Reject
            }
        }
    }

    async fn handle_close(&self, msg: CloseConnection) -> DispatchStatus {
        let peer_id = msg.connection_id;
        let removed = self.registry.lock().await.remove(peer_id);

        match removed {
            Some(channel) => {
                info!(
                    "Close request for connection {} (channel {})",
                    peer_id,
                    channel.local_id()
                );
                self.release(channel).await;
            }
            None => {
                debug!("Close request for unknown connection {}", peer_id);
            }
        }
        DispatchStatus::Ok
    }

    async fn handle_send(&self, msg: SendData<'_>) -> DispatchStatus {
        let peer_id = msg.connection_id;
        let mut state = self.registry.lock().await;

        let channel = match state.get_mut(peer_id) {
            Some(channel) => channel,
            None => {
                debug!(
                    "Dropping {} bytes for unknown connection {}",
                    msg.data.len(),
                    peer_id
                );
                BridgeMetrics::incr(&self.metrics.sends_to_unknown_channel);
                return DispatchStatus::Ok;
            }
        };

        trace!(
            "Sending {} bytes from connection {} to channel {}",
            msg.data.len(),
            peer_id,
            channel.local_id()
        );

        match self.transport.send(channel.socket_mut(), msg.data).await {
            Ok(sent) if sent == msg.data.len() => {
                channel.record_sent(sent);
                BridgeMetrics::add(&self.metrics.bytes_to_host, sent as u64);
                DispatchStatus::Ok
            }
            Ok(sent) => {
                channel.record_sent(sent);
                BridgeMetrics::add(&self.metrics.bytes_to_host, sent as u64);
                warn!(
                    "Short write on connection {}: {} of {} bytes",
                    peer_id,
                    sent,
                    msg.data.len()
                );
                BridgeMetrics::incr(&self.metrics.send_failures_transient);
                DispatchStatus::Reject
            }
            Err(e) => {
                let failure = SendFailure::classify(&e);
                match failure {
                    SendFailure::Transient => {
                        warn!(
                            "Transient send failure on connection {}, payload dropped: {}",
                            peer_id, e
                        );
                        BridgeMetrics::incr(&self.metrics.send_failures_transient);
                    }
                    SendFailure::PeerClosed => {
                        info!("Host peer closed connection {}: {}", peer_id, e);
                        BridgeMetrics::incr(&self.metrics.send_failures_peer_closed);
                    }
                    SendFailure::Fatal => {
                        warn!("Send failed on connection {}, closing: {}", peer_id, e);
                        BridgeMetrics::incr(&self.metrics.send_failures_fatal);
                    }
                }

                if failure.is_terminal() {
                    let removed = state.remove(peer_id);
                    drop(state);
                    if let Some(channel) = removed {
                        self.release(channel).await;
                    }
                }
                DispatchStatus::Reject
            }
        }
    }

    async fn handle_ip_fqdn(&self, msg: IpFqdn) -> DispatchStatus {
        match self.identity.update_fqdn(&msg.fqdn).await {
            Ok(()) => {
                debug!("Host FQDN updated to {:?}", msg.fqdn);
                BridgeMetrics::incr(&self.metrics.identity_updates);
            }
            Err(e) => {
                error!("Failed to update IP/FQDN info: {}", BridgeError::from(e));
                BridgeMetrics::incr(&self.metrics.identity_update_failures);
            }
        }
        DispatchStatus::Ok
    }

    /// Close every registered channel. Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        let channels = self.registry.drain().await;
        let count = channels.len();
        for channel in channels {
            self.release(channel).await;
        }
        if count > 0 {
            info!("Closed {} channels on shutdown", count);
        }
        count
    }

    /// Release a channel that has already left both registry maps.
    async fn release(&self, channel: Channel<T::Socket>) {
        self.transport.close(channel.close()).await;
        BridgeMetrics::incr(&self.metrics.channels_closed);
    }
}
