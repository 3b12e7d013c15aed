use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::notifier::Notifier;
use crate::transport::{ConnectTarget, SocketTransport};

/// Socket handle produced by [`MockSocketTransport`].
///
/// Deliberately not `Clone`: a handle can only be closed once.
#[derive(Debug, PartialEq, Eq)]
pub struct MockSocket {
    pub id: u64,
}

/// In-memory transport for testing the dispatcher without real sockets.
///
/// Records every connect, send and close, and can be told to fail connects
/// or sends with a given error kind.
#[derive(Default)]
pub struct MockSocketTransport {
    next_id: AtomicU64,
    connects: Mutex<Vec<ConnectTarget>>,
    sends: Mutex<Vec<(u64, Vec<u8>)>>,
    closes: Mutex<Vec<u64>>,
    connect_error: RwLock<Option<io::ErrorKind>>,
    send_error: RwLock<Option<io::ErrorKind>>,
    short_write: RwLock<Option<usize>>,
}

impl MockSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following connect fail with `kind` (`None` to succeed again)
    pub fn fail_connects(&self, kind: Option<io::ErrorKind>) {
        *self.connect_error.write() = kind;
    }

    /// Make every following send fail with `kind` (`None` to succeed again)
    pub fn fail_sends(&self, kind: Option<io::ErrorKind>) {
        *self.send_error.write() = kind;
    }

    /// Cap the number of bytes each send reports as written
    pub fn limit_writes(&self, limit: Option<usize>) {
        *self.short_write.write() = limit;
    }

    /// Targets passed to `connect`, including failed attempts
    pub fn connects(&self) -> Vec<ConnectTarget> {
        self.connects.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    /// `(socket id, payload)` for every successful send
    pub fn sends(&self) -> Vec<(u64, Vec<u8>)> {
        self.sends.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().len()
    }

    /// Socket ids in the order they were closed
    pub fn closes(&self) -> Vec<u64> {
        self.closes.lock().clone()
    }

    /// How many times the socket with `id` was closed
    pub fn close_count(&self, id: u64) -> usize {
        self.closes.lock().iter().filter(|closed| **closed == id).count()
    }

    /// Number of sockets handed out and not yet closed
    pub fn open_sockets(&self) -> usize {
        let opened = self.next_id.load(Ordering::SeqCst) as usize;
        opened.saturating_sub(self.closes.lock().len())
    }
}

#[async_trait]
impl SocketTransport for MockSocketTransport {
    type Socket = MockSocket;

    async fn connect(&self, target: &ConnectTarget) -> io::Result<MockSocket> {
        self.connects.lock().push(target.clone());
        if let Some(kind) = *self.connect_error.read() {
            return Err(io::Error::new(kind, format!("mock connect to {} failed", target)));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockSocket { id })
    }

    async fn send(&self, socket: &mut MockSocket, data: &[u8]) -> io::Result<usize> {
        if let Some(kind) = *self.send_error.read() {
            return Err(io::Error::from(kind));
        }
        let written = match *self.short_write.read() {
            Some(limit) => data.len().min(limit),
            None => data.len(),
        };
        self.sends.lock().push((socket.id, data[..written].to_vec()));
        Ok(written)
    }

    async fn close(&self, socket: MockSocket) {
        self.closes.lock().push(socket.id);
    }
}

/// Notifier that only counts signals
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    signals: AtomicU64,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_count(&self) -> u64 {
        self.signals.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn signal(&self) {
        self.signals.fetch_add(1, Ordering::SeqCst);
    }
}
