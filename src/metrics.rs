//! Bridge metrics for observability.
//!
//! Counters are plain atomics updated on every dispatched message, so they
//! are cheap enough to keep on in production.
//!
//! # Metric Categories
//!
//! ## Message Metrics
//! - `messages_received`: Total messages handed to the dispatcher
//! - `messages_rejected`: Messages answered with `Reject`
//! - `malformed_messages`: Unknown tags or undecodable records
//!
//! ## Channel Metrics
//! - `channels_opened` / `channels_closed`
//! - `connect_failures`: Opens that failed to establish a socket
//! - `duplicate_opens`: Opens naming a connection id that is already live
//! - `channel_id_exhaustions`: Opens refused because every local id was in use
//!
//! ## Data Metrics
//! - `bytes_to_host`: Payload bytes written to host sockets
//! - `sends_to_unknown_channel`: SendData for a connection that is not registered
//! - `send_failures_peer_closed` / `send_failures_transient` / `send_failures_fatal`
//!
//! ## Identity Metrics
//! - `identity_updates` / `identity_update_failures`

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic ordering used for metrics (Relaxed is sufficient for counters).
const METRIC_ORDERING: Ordering = Ordering::Relaxed;

#[derive(Debug, Default)]
pub struct BridgeMetrics {
    pub messages_received: AtomicU64,
    pub messages_rejected: AtomicU64,
    pub malformed_messages: AtomicU64,

    pub channels_opened: AtomicU64,
    pub channels_closed: AtomicU64,
    pub connect_failures: AtomicU64,
    pub duplicate_opens: AtomicU64,
    pub channel_id_exhaustions: AtomicU64,

    pub bytes_to_host: AtomicU64,
    pub sends_to_unknown_channel: AtomicU64,
    pub send_failures_peer_closed: AtomicU64,
    pub send_failures_transient: AtomicU64,
    pub send_failures_fatal: AtomicU64,

    pub identity_updates: AtomicU64,
    pub identity_update_failures: AtomicU64,
}

/// Point-in-time copy of [`BridgeMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_rejected: u64,
    pub malformed_messages: u64,
    pub channels_opened: u64,
    pub channels_closed: u64,
    pub connect_failures: u64,
    pub duplicate_opens: u64,
    pub channel_id_exhaustions: u64,
    pub bytes_to_host: u64,
    pub sends_to_unknown_channel: u64,
    pub send_failures_peer_closed: u64,
    pub send_failures_transient: u64,
    pub send_failures_fatal: u64,
    pub identity_updates: u64,
    pub identity_update_failures: u64,
}

impl MetricsSnapshot {
    /// Channels opened and not yet closed.
    pub fn channels_active(&self) -> u64 {
        self.channels_opened.saturating_sub(self.channels_closed)
    }
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, METRIC_ORDERING);
    }

    #[inline]
    pub(crate) fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, METRIC_ORDERING);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(METRIC_ORDERING),
            messages_rejected: self.messages_rejected.load(METRIC_ORDERING),
            malformed_messages: self.malformed_messages.load(METRIC_ORDERING),
            channels_opened: self.channels_opened.load(METRIC_ORDERING),
            channels_closed: self.channels_closed.load(METRIC_ORDERING),
            connect_failures: self.connect_failures.load(METRIC_ORDERING),
            duplicate_opens: self.duplicate_opens.load(METRIC_ORDERING),
            channel_id_exhaustions: self.channel_id_exhaustions.load(METRIC_ORDERING),
            bytes_to_host: self.bytes_to_host.load(METRIC_ORDERING),
            sends_to_unknown_channel: self.sends_to_unknown_channel.load(METRIC_ORDERING),
            send_failures_peer_closed: self.send_failures_peer_closed.load(METRIC_ORDERING),
            send_failures_transient: self.send_failures_transient.load(METRIC_ORDERING),
            send_failures_fatal: self.send_failures_fatal.load(METRIC_ORDERING),
            identity_updates: self.identity_updates.load(METRIC_ORDERING),
            identity_update_failures: self.identity_update_failures.load(METRIC_ORDERING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = BridgeMetrics::new();
        BridgeMetrics::incr(&metrics.channels_opened);
        BridgeMetrics::incr(&metrics.channels_opened);
        BridgeMetrics::incr(&metrics.channels_closed);
        BridgeMetrics::add(&metrics.bytes_to_host, 512);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.channels_opened, 2);
        assert_eq!(snapshot.channels_active(), 1);
        assert_eq!(snapshot.bytes_to_host, 512);
        assert_eq!(snapshot.messages_rejected, 0);
    }
}
