// Core Channel entity

use std::fmt;
use std::time::{Duration, Instant};

use crate::transport::ConnectTarget;

/// Identifier chosen by the engine for a connection; the primary lookup key.
pub type PeerChannelId = u32;

/// Identifier assigned by this bridge for its own bookkeeping.
pub type LocalChannelId = u32;

/// Reserved local id meaning "no identifier available". Never assigned.
pub const ILLEGAL_CHANNEL_ID: LocalChannelId = u32::MAX;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChannelStatus {
    Opening,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Opening => write!(f, "Opening"),
            ChannelStatus::Open => write!(f, "Open"),
            ChannelStatus::Closing => write!(f, "Closing"),
            ChannelStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// One bridged connection between an engine peer id and a host socket.
///
/// The socket is owned exclusively by the channel. [`Channel::close`]
/// consumes the channel and hands the socket back for release, so a socket
/// can only ever be released once.
pub struct Channel<S> {
    socket: S,
    local_id: LocalChannelId,
    peer_id: PeerChannelId,
    status: ChannelStatus,
    tx_window: u32,
    target: ConnectTarget,
    opened_at: Instant,
    bytes_to_host: u64,
}

impl<S> Channel<S> {
    /// Wrap a freshly connected socket. The channel starts in `Opening`
    /// with no local id and no credit; [`Channel::open`] completes it.
    pub fn new(socket: S, peer_id: PeerChannelId, target: ConnectTarget) -> Self {
        Self {
            socket,
            local_id: ILLEGAL_CHANNEL_ID,
            peer_id,
            status: ChannelStatus::Opening,
            tx_window: 0,
            target,
            opened_at: Instant::now(),
            bytes_to_host: 0,
        }
    }

    /// Mark the channel open and credit its initial transmit window.
    pub fn open(&mut self, initial_tx_window: u32) {
        self.status = ChannelStatus::Open;
        self.add_bytes_tx_window(initial_tx_window);
    }

    pub(crate) fn set_local_id(&mut self, local_id: LocalChannelId) {
        self.local_id = local_id;
    }

    pub fn local_id(&self) -> LocalChannelId {
        self.local_id
    }

    pub fn peer_id(&self) -> PeerChannelId {
        self.peer_id
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    pub fn tx_window(&self) -> u32 {
        self.tx_window
    }

    /// Grant additional credit. Saturates instead of wrapping.
    pub fn add_bytes_tx_window(&mut self, bytes: u32) {
        self.tx_window = self.tx_window.saturating_add(bytes);
    }

    /// Take up to `wanted` bytes of credit and return how many were granted.
    pub fn consume_tx_window(&mut self, wanted: u32) -> u32 {
        let granted = wanted.min(self.tx_window);
        self.tx_window -= granted;
        granted
    }

    pub fn bytes_to_host(&self) -> u64 {
        self.bytes_to_host
    }

    pub(crate) fn record_sent(&mut self, bytes: usize) {
        self.bytes_to_host = self.bytes_to_host.saturating_add(bytes as u64);
    }

    /// Tear the channel down and return its socket for release.
    pub fn close(mut self) -> S {
        self.status = ChannelStatus::Closing;
        debug!(
            "Channel {} (peer {}) {} after {:?}, {} bytes to host",
            self.local_id,
            self.peer_id,
            self.status,
            self.opened_at.elapsed(),
            self.bytes_to_host
        );
        self.status = ChannelStatus::Closed;
        self.socket
    }
}

impl<S> fmt::Debug for Channel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("local_id", &self.local_id)
            .field("peer_id", &self.peer_id)
            .field("status", &self.status)
            .field("tx_window", &self.tx_window)
            .field("target", &self.target)
            .field("bytes_to_host", &self.bytes_to_host)
            .finish()
    }
}
