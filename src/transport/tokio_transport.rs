use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::timeout;

use super::{AddressFamily, ConnectTarget, SocketKind, SocketTransport};
use crate::config::TransportConfig;

/// Socket owned by a registered channel.
#[derive(Debug)]
pub enum HostSocket {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl HostSocket {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            HostSocket::Tcp(stream) => stream.peer_addr(),
            HostSocket::Udp(socket) => socket.peer_addr(),
        }
    }

    pub fn kind(&self) -> SocketKind {
        match self {
            HostSocket::Tcp(_) => SocketKind::Stream,
            HostSocket::Udp(_) => SocketKind::Datagram,
        }
    }
}

/// Transport backed by tokio sockets.
#[derive(Debug, Clone)]
pub struct TokioSocketTransport {
    connect_timeout: Duration,
    send_timeout: Duration,
    tcp_nodelay: bool,
}

impl TokioSocketTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            send_timeout: config.send_timeout(),
            tcp_nodelay: config.tcp_nodelay,
        }
    }

    async fn resolve(&self, target: &ConnectTarget) -> io::Result<Vec<SocketAddr>> {
        let resolved = timeout(
            self.connect_timeout,
            lookup_host((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("resolving {} timed out", target.host),
            )
        })??;

        let addrs: Vec<SocketAddr> = resolved
            .filter(|addr| match target.family {
                AddressFamily::Ipv4 => addr.is_ipv4(),
                AddressFamily::Ipv6 => addr.is_ipv6(),
            })
            .collect();

        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no {:?} address for {}", target.family, target.host),
            ));
        }
        Ok(addrs)
    }

    async fn connect_addr(&self, addr: SocketAddr, kind: SocketKind) -> io::Result<HostSocket> {
        match kind {
            SocketKind::Stream => {
                let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
                    .await
                    .map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("connect to {} timed out", addr),
                        )
                    })??;
                if self.tcp_nodelay {
                    stream.set_nodelay(true)?;
                }
                Ok(HostSocket::Tcp(stream))
            }
            SocketKind::Datagram => {
                let bind_addr: SocketAddr = if addr.is_ipv4() {
                    SocketAddr::from(([0, 0, 0, 0], 0))
                } else {
                    SocketAddr::from(([0u16; 8], 0))
                };
                let socket = UdpSocket::bind(bind_addr).await?;
                socket.connect(addr).await?;
                Ok(HostSocket::Udp(socket))
            }
        }
    }
}

#[async_trait::async_trait]
impl SocketTransport for TokioSocketTransport {
    type Socket = HostSocket;

    async fn connect(&self, target: &ConnectTarget) -> io::Result<HostSocket> {
        let addrs = self.resolve(target).await?;

        let mut last_err = None;
        for addr in addrs {
            match self.connect_addr(addr, target.kind).await {
                Ok(socket) => {
                    debug!("Connected {} via {}", target, addr);
                    return Ok(socket);
                }
                Err(e) => {
                    debug!("Connect to {} ({}) failed: {}", target, addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", target))
        }))
    }

    /// Writes are bounded by the send timeout. A write that times out may
    /// have been partly delivered and reports `TimedOut`.
    async fn send(&self, socket: &mut HostSocket, data: &[u8]) -> io::Result<usize> {
        let write = async {
            match socket {
                HostSocket::Tcp(stream) => stream.write_all(data).await.map(|()| data.len()),
                HostSocket::Udp(socket) => socket.send(data).await,
            }
        };

        timeout(self.send_timeout, write).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("write of {} bytes timed out", data.len()),
            )
        })?
    }

    async fn close(&self, socket: HostSocket) {
        if let HostSocket::Tcp(mut stream) = socket {
            if let Err(e) = stream.shutdown().await {
                debug!("Socket shutdown returned: {}", e);
            }
        }
    }
}
