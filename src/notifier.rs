//! Wake-up signal from the dispatcher to the socket event loop.

use std::sync::Arc;
use tokio::sync::Notify;

/// Wakes the event loop after new channel state becomes visible.
pub trait Notifier: Send + Sync {
    fn signal(&self);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn signal(&self) {
        (**self).signal()
    }
}

/// Notifier backed by [`tokio::sync::Notify`].
///
/// A signal sent while the event loop is busy is stored and consumed by the
/// next [`EventLoopNotifier::notified`] call, so wake-ups are never lost.
#[derive(Debug, Default, Clone)]
pub struct EventLoopNotifier {
    notify: Arc<Notify>,
}

impl EventLoopNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next signal. Called by the event loop.
    pub async fn notified(&self) {
        self.notify.notified().await
    }
}

impl Notifier for EventLoopNotifier {
    fn signal(&self) {
        self.notify.notify_one();
    }
}
