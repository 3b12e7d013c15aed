//! End-to-end tests for the framed management-interface listener.

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;

use mei_bridge::config::{Config, IngressConfig};
use mei_bridge::protocol::{CloseConnection, HostField, Message, OpenConnectionEx};
use mei_bridge::{
    EventLoopNotifier, FqdnCache, IngressListener, ProtocolDispatcher, TokioSocketTransport,
};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

type Dispatcher = ProtocolDispatcher<TokioSocketTransport, EventLoopNotifier>;

async fn start_bridge(
    max_message_len: usize,
) -> (Arc<Dispatcher>, TcpStream, broadcast::Sender<()>) {
    let config = Config::default();
    let dispatcher = Arc::new(ProtocolDispatcher::new(
        &config,
        Arc::new(TokioSocketTransport::new(&config.transport)),
        EventLoopNotifier::new(),
        Arc::new(FqdnCache::new()),
    ));

    let ingress = IngressConfig {
        listen_address: "127.0.0.1".to_string(),
        listen_port: 0,
        max_message_len,
    };
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let listener = IngressListener::bind(&ingress, Arc::clone(&dispatcher), shutdown_rx)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(listener.run());

    let session = TcpStream::connect(addr).await.unwrap();
    (dispatcher, session, shutdown_tx)
}

async fn exchange(session: &mut TcpStream, message: &[u8]) -> u8 {
    let mut frame = BytesMut::new();
    frame.put_u32(message.len() as u32);
    frame.put_slice(message);
    session.write_all(&frame).await.unwrap();
    timeout(IO_TIMEOUT, session.read_u8()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_framed_open_and_close() {
    let host = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = host.local_addr().unwrap().port();
    let (dispatcher, mut session, shutdown_tx) = start_bridge(1024).await;

    let open = Message::OpenConnectionEx(OpenConnectionEx {
        protocol: 0,
        flags: 0,
        connection_id: 7,
        port,
        host: HostField::Ipv4([127, 0, 0, 1].into()),
    })
    .encode()
    .unwrap();
    assert_eq!(exchange(&mut session, &open).await, 0);
    assert_eq!(dispatcher.registry().len().await, 1);

    let close = Message::CloseConnection(CloseConnection { connection_id: 7 })
        .encode()
        .unwrap();
    assert_eq!(exchange(&mut session, &close).await, 0);
    assert!(dispatcher.registry().is_empty().await);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_malformed_message_gets_reject_byte() {
    let (_dispatcher, mut session, shutdown_tx) = start_bridge(1024).await;

    assert_eq!(exchange(&mut session, &[0x42, 1, 2, 3]).await, 1);
    assert_eq!(exchange(&mut session, &[]).await, 1);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_oversized_frame_ends_session() {
    let (_dispatcher, mut session, shutdown_tx) = start_bridge(8).await;

    let mut frame = BytesMut::new();
    frame.put_u32(64);
    frame.put_slice(&[0u8; 64]);
    session.write_all(&frame).await.unwrap();

    let mut rest = Vec::new();
    let read = timeout(IO_TIMEOUT, session.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(read, 0, "bridge should close the session without replying");

    let _ = shutdown_tx.send(());
}
