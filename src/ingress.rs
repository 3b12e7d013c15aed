//! Management-interface listener.
//!
//! The engine side connects over TCP and sends length-prefixed messages:
//!
//! ```text
//! ┌───────────────┬────────────────────────────┐
//! │ len (u32 BE)  │ message (len bytes)        │
//! └───────────────┴────────────────────────────┘
//! ```
//!
//! Each message is handed to the [`ProtocolDispatcher`] in arrival order and
//! answered with a single status byte (0 = ok, 1 = reject). A frame longer
//! than `ingress.max_message_len` ends the session.

use bytes::{Buf, Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::config::IngressConfig;
use crate::dispatcher::ProtocolDispatcher;
use crate::error::{BridgeError, Result};
use crate::notifier::Notifier;
use crate::transport::SocketTransport;

/// Size of the frame length prefix.
pub const FRAME_LEN_PREFIX: usize = 4;

/// Split one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` until the whole frame has arrived. A length above
/// `max_len` is an error and leaves the buffer untouched.
pub fn try_parse_frame(buf: &mut BytesMut, max_len: usize) -> Result<Option<Bytes>> {
    if buf.len() < FRAME_LEN_PREFIX {
        return Ok(None);
    }

    let mut cursor = &buf[..];
    let len = cursor.get_u32() as usize;
    if len > max_len {
        return Err(BridgeError::Protocol(format!(
            "frame of {} bytes exceeds limit of {}",
            len, max_len
        )));
    }
    if buf.len() < FRAME_LEN_PREFIX + len {
        return Ok(None);
    }

    buf.advance(FRAME_LEN_PREFIX);
    Ok(Some(buf.split_to(len).freeze()))
}

/// TCP listener feeding framed messages into a dispatcher
pub struct IngressListener<T: SocketTransport, N: Notifier> {
    listener: TcpListener,
    dispatcher: Arc<ProtocolDispatcher<T, N>>,
    max_message_len: usize,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<T, N> IngressListener<T, N>
where
    T: SocketTransport + 'static,
    N: Notifier + 'static,
{
    /// Bind to the configured address.
    pub async fn bind(
        config: &IngressConfig,
        dispatcher: Arc<ProtocolDispatcher<T, N>>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.listen_address, config.listen_port);
        let listener = TcpListener::bind(&addr).await?;
        info!("Listening for management interface on {}", addr);

        Ok(Self {
            listener,
            dispatcher,
            max_message_len: config.max_message_len,
            shutdown_rx,
        })
    }

    /// Get the local address the listener is bound to.
    ///
    /// This is useful when binding to port 0 to get an OS-assigned port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until the shutdown signal fires.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("Accepted management session from {}", addr);
                            let dispatcher = Arc::clone(&self.dispatcher);
                            let shutdown_rx = self.shutdown_rx.resubscribe();
                            let max_len = self.max_message_len;

                            tokio::spawn(async move {
                                if let Err(e) =
                                    Self::handle_session(stream, dispatcher, max_len, shutdown_rx).await
                                {
                                    warn!("Management session from {} ended: {}", addr, e);
                                }
                                debug!("Management session from {} closed", addr);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_session(
        mut stream: TcpStream,
        dispatcher: Arc<ProtocolDispatcher<T, N>>,
        max_len: usize,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut buf = BytesMut::with_capacity(4096);

        loop {
            while let Some(message) = try_parse_frame(&mut buf, max_len)? {
                let status = dispatcher.handle(&message).await;
                stream.write_u8(status.as_byte()).await?;
            }

            tokio::select! {
                read = stream.read_buf(&mut buf) => {
                    if read? == 0 {
                        if !buf.is_empty() {
                            debug!("Session closed with {} unframed bytes pending", buf.len());
                        }
                        return Ok(());
                    }
                }
                _ = shutdown_rx.recv() => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    fn frame(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);
        buf
    }

    #[test]
    fn test_parse_waits_for_complete_frame() {
        let full = frame(&[0x03, 0, 0, 0, 7]);

        let mut partial = BytesMut::from(&full[..3]);
        assert!(try_parse_frame(&mut partial, 64).unwrap().is_none());

        let mut partial = BytesMut::from(&full[..6]);
        assert!(try_parse_frame(&mut partial, 64).unwrap().is_none());
        assert_eq!(partial.len(), 6, "incomplete frame must not be consumed");
    }

    #[test]
    fn test_parse_splits_back_to_back_frames() {
        let mut buf = frame(b"first");
        buf.extend_from_slice(&frame(b"second"));

        assert_eq!(try_parse_frame(&mut buf, 64).unwrap().unwrap(), &b"first"[..]);
        assert_eq!(try_parse_frame(&mut buf, 64).unwrap().unwrap(), &b"second"[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_parse_rejects_oversized_frame() {
        let mut buf = frame(&[0u8; 32]);
        assert!(matches!(
            try_parse_frame(&mut buf, 16),
            Err(BridgeError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_empty_frame() {
        let mut buf = frame(&[]);
        let message = try_parse_frame(&mut buf, 16).unwrap().unwrap();
        assert!(message.is_empty());
        assert!(buf.is_empty());
    }
}
