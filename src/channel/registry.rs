//! Channel registry shared by the dispatcher and the socket event loop.
//!
//! Two maps live behind one mutex:
//! - `by_peer`: engine connection id -> [`Channel`] (sole owner)
//! - `by_local`: local channel id -> engine connection id (key only)
//!
//! Every mutation goes through [`RegistryState`], which is only reachable
//! through the lock guard, so the two maps are always changed together.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::core::{Channel, LocalChannelId, PeerChannelId, ILLEGAL_CHANNEL_ID};
use crate::error::BridgeError;

/// Handle passed to every component that touches the registry.
pub type RegistryHandle<S> = Arc<ChannelRegistry<S>>;

/// A channel that could not be registered, handed back so its socket can
/// be released by the caller.
pub struct RegistrationError<S> {
    pub reason: BridgeError,
    pub channel: Channel<S>,
}

impl<S> std::fmt::Debug for RegistrationError<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationError")
            .field("reason", &self.reason)
            .field("channel", &self.channel)
            .finish()
    }
}

/// State guarded by the registry mutex.
pub struct RegistryState<S> {
    by_peer: HashMap<PeerChannelId, Channel<S>>,
    by_local: HashMap<LocalChannelId, PeerChannelId>,
    /// Last id handed out; allocation resumes after it.
    last_id: LocalChannelId,
    max_id: LocalChannelId,
}

impl<S> RegistryState<S> {
    fn new(max_id: LocalChannelId) -> Self {
        Self {
            by_peer: HashMap::new(),
            by_local: HashMap::new(),
            last_id: 0,
            max_id: max_id.clamp(1, ILLEGAL_CHANNEL_ID - 1),
        }
    }

    /// Pick the next free local id, wrapping from `max_id` back to 1.
    ///
    /// Skips the reserved sentinel and every id present in the reverse map.
    /// Returns `None` once a full cycle finds nothing free.
    pub fn allocate_local_id(&mut self) -> Option<LocalChannelId> {
        if self.by_local.len() >= self.max_id as usize {
            return None;
        }

        let mut candidate = self.last_id;
        for _ in 0..self.max_id {
            candidate = if candidate >= self.max_id {
                1
            } else {
                candidate + 1
            };
            if candidate != ILLEGAL_CHANNEL_ID && !self.by_local.contains_key(&candidate) {
                self.last_id = candidate;
                return Some(candidate);
            }
        }
        None
    }

    /// Allocate a local id for `channel` and insert it into both maps.
    ///
    /// On failure nothing is inserted and the channel is returned to the
    /// caller, which still owns its socket.
    pub fn register(
        &mut self,
        mut channel: Channel<S>,
    ) -> std::result::Result<LocalChannelId, RegistrationError<S>> {
        let peer_id = channel.peer_id();
        if self.by_peer.contains_key(&peer_id) {
            return Err(RegistrationError {
                reason: BridgeError::DuplicateChannel(peer_id),
                channel,
            });
        }

        let local_id = match self.allocate_local_id() {
            Some(id) => id,
            None => {
                return Err(RegistrationError {
                    reason: BridgeError::ChannelIdsExhausted,
                    channel,
                })
            }
        };

        channel.set_local_id(local_id);
        self.by_peer.insert(peer_id, channel);
        self.by_local.insert(local_id, peer_id);
        Ok(local_id)
    }

    /// Remove the channel registered under `peer_id` from both maps.
    pub fn remove(&mut self, peer_id: PeerChannelId) -> Option<Channel<S>> {
        let channel = self.by_peer.remove(&peer_id)?;
        self.by_local.remove(&channel.local_id());
        Some(channel)
    }

    /// Remove the channel registered under `local_id` from both maps.
    pub fn remove_local(&mut self, local_id: LocalChannelId) -> Option<Channel<S>> {
        let peer_id = *self.by_local.get(&local_id)?;
        self.remove(peer_id)
    }

    pub fn get(&self, peer_id: PeerChannelId) -> Option<&Channel<S>> {
        self.by_peer.get(&peer_id)
    }

    pub fn get_mut(&mut self, peer_id: PeerChannelId) -> Option<&mut Channel<S>> {
        self.by_peer.get_mut(&peer_id)
    }

    pub fn peer_for_local(&self, local_id: LocalChannelId) -> Option<PeerChannelId> {
        self.by_local.get(&local_id).copied()
    }

    pub fn contains_peer(&self, peer_id: PeerChannelId) -> bool {
        self.by_peer.contains_key(&peer_id)
    }

    pub fn len(&self) -> usize {
        self.by_peer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_peer.is_empty()
    }

    /// Local ids currently in use, in no particular order.
    pub fn local_ids(&self) -> Vec<LocalChannelId> {
        self.by_local.keys().copied().collect()
    }

    /// Remove every channel from both maps.
    pub fn drain(&mut self) -> Vec<Channel<S>> {
        self.by_local.clear();
        self.by_peer.drain().map(|(_, channel)| channel).collect()
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.by_peer.len(), self.by_local.len());
        for (peer_id, channel) in &self.by_peer {
            assert_eq!(channel.peer_id(), *peer_id);
            assert_ne!(channel.local_id(), ILLEGAL_CHANNEL_ID);
            assert_eq!(self.by_local.get(&channel.local_id()), Some(peer_id));
        }
    }
}

/// Two-way channel map under a single mutex.
pub struct ChannelRegistry<S> {
    state: Mutex<RegistryState<S>>,
}

impl<S> ChannelRegistry<S> {
    /// Create a registry handing out local ids in `1..=max_channel_id`.
    pub fn new(max_channel_id: LocalChannelId) -> Self {
        Self {
            state: Mutex::new(RegistryState::new(max_channel_id)),
        }
    }

    pub fn shared(max_channel_id: LocalChannelId) -> RegistryHandle<S> {
        Arc::new(Self::new(max_channel_id))
    }

    /// Enter the critical section.
    pub async fn lock(&self) -> MutexGuard<'_, RegistryState<S>> {
        self.state.lock().await
    }

    pub async fn len(&self) -> usize {
        self.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lock().await.is_empty()
    }

    pub async fn contains_peer(&self, peer_id: PeerChannelId) -> bool {
        self.lock().await.contains_peer(peer_id)
    }

    pub async fn peer_for_local(&self, local_id: LocalChannelId) -> Option<PeerChannelId> {
        self.lock().await.peer_for_local(local_id)
    }

    /// Teardown entry point for the event loop, which knows sockets by
    /// their local id.
    pub async fn remove_by_local(&self, local_id: LocalChannelId) -> Option<Channel<S>> {
        let removed = self.lock().await.remove_local(local_id);
        if let Some(ref channel) = removed {
            debug!(
                "Channel {} (peer {}) removed by event loop",
                local_id,
                channel.peer_id()
            );
        }
        removed
    }

    pub async fn remove_by_peer(&self, peer_id: PeerChannelId) -> Option<Channel<S>> {
        self.lock().await.remove(peer_id)
    }

    /// Run `f` against the channel registered under `peer_id` while the
    /// lock is held.
    pub async fn with_channel_mut<R, F>(&self, peer_id: PeerChannelId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Channel<S>) -> R,
    {
        self.lock().await.get_mut(peer_id).map(f)
    }

    pub async fn drain(&self) -> Vec<Channel<S>> {
        self.lock().await.drain()
    }
}
