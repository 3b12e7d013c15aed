//! Host socket transport.
//!
//! The dispatcher never touches sockets directly; it goes through
//! [`SocketTransport`], which owns the connect/send/close primitives and
//! address resolution. [`TokioSocketTransport`] is the production
//! implementation; tests use [`crate::mock::MockSocketTransport`].

use std::fmt;
use std::io;

use crate::protocol::ProtocolKind;

mod tokio_transport;

pub use tokio_transport::{HostSocket, TokioSocketTransport};

/// Socket type requested from the transport.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SocketKind {
    Stream,
    Datagram,
}

impl From<ProtocolKind> for SocketKind {
    fn from(kind: ProtocolKind) -> Self {
        match kind {
            ProtocolKind::Tcp => SocketKind::Stream,
            ProtocolKind::Udp => SocketKind::Datagram,
        }
    }
}

/// Address family a destination must resolve to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

/// Where a channel's socket should connect.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConnectTarget {
    pub host: String,
    /// Host byte order.
    pub port: u16,
    pub family: AddressFamily,
    pub kind: SocketKind,
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = match self.kind {
            SocketKind::Stream => "tcp",
            SocketKind::Datagram => "udp",
        };
        write!(f, "{}://{}:{}", proto, self.host, self.port)
    }
}

/// How a failed write affects the channel that issued it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SendFailure {
    /// The remote end is gone; the channel must be torn down.
    PeerClosed,
    /// The socket is still usable; only this payload was lost.
    Transient,
    /// Any other error, including a timed-out write that may have left a
    /// partial payload on the wire; the socket is not trusted any more.
    Fatal,
}

impl SendFailure {
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => SendFailure::PeerClosed,
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => SendFailure::Transient,
            _ => SendFailure::Fatal,
        }
    }

    /// Whether the channel has to be removed from the registry.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SendFailure::Transient)
    }
}

/// Connect/send/close primitives over host sockets.
#[async_trait::async_trait]
pub trait SocketTransport: Send + Sync {
    /// Handle owned by a channel for as long as it is registered.
    type Socket: Send + 'static;

    /// Resolve `target` and open a socket of the requested kind.
    async fn connect(&self, target: &ConnectTarget) -> io::Result<Self::Socket>;

    /// Write `data` to the socket, returning the number of bytes accepted.
    async fn send(&self, socket: &mut Self::Socket, data: &[u8]) -> io::Result<usize>;

    /// Release the socket. Consumes the handle so it cannot be released twice.
    async fn close(&self, socket: Self::Socket);
}
