// Decoding edge cases, protocol mapping and identity updates
#![cfg(test)]
use std::sync::Arc;

use super::common::*;
use crate::config::Config;
use crate::dispatcher::{DispatchStatus, ProtocolDispatcher};
use crate::mock::{MockSocketTransport, RecordingNotifier};
use crate::protocol::constants::{PROTOCOL_TYPE_TCP_IPV4, PROTOCOL_TYPE_UDP_IPV4};
use crate::protocol::HostField;
use crate::transport::SocketKind;

#[tokio::test]
async fn test_unknown_tag_is_rejected() {
    let h = harness();
    for buffer in [vec![0x01, 0, 0, 0, 7], vec![0xff], Vec::new()] {
        assert_eq!(h.dispatcher.handle(&buffer).await, DispatchStatus::Reject);
    }
    assert_eq!(h.transport.connect_count(), 0);
    assert_eq!(h.dispatcher.metrics().snapshot().malformed_messages, 3);
}

#[tokio::test]
async fn test_truncated_open_is_rejected_without_connecting() {
    let h = harness();
    let full = open_tcp(7, [10, 0, 0, 1], 80);

    for len in [1, 6, full.len() - 1] {
        let status = h.dispatcher.handle(&full[..len]).await;
        assert_eq!(status, DispatchStatus::Reject, "prefix of {} bytes", len);
    }
    assert_eq!(h.transport.connect_count(), 0);
    assert!(h.dispatcher.registry().is_empty().await);
}

#[tokio::test]
async fn test_truncated_send_is_rejected_without_sending() {
    let h = harness();
    h.dispatcher.handle(&open_tcp(7, [10, 0, 0, 1], 80)).await;

    let mut short = send_msg(7, b"0123456789");
    short.truncate(short.len() - 4);
    assert_eq!(h.dispatcher.handle(&short).await, DispatchStatus::Reject);
    assert_eq!(h.transport.send_count(), 0);
    assert_eq!(h.dispatcher.registry().len().await, 1);
}

#[tokio::test]
async fn test_truncated_close_is_rejected() {
    let h = harness();
    h.dispatcher.handle(&open_tcp(7, [10, 0, 0, 1], 80)).await;

    let close = close_msg(7);
    assert_eq!(
        h.dispatcher.handle(&close[..3]).await,
        DispatchStatus::Reject
    );
    assert_eq!(h.dispatcher.registry().len().await, 1);
}

#[tokio::test]
async fn test_send_ignores_trailing_bytes() {
    let h = harness();
    h.dispatcher.handle(&open_tcp(7, [10, 0, 0, 1], 80)).await;

    let mut msg = send_msg(7, b"abc");
    msg.extend_from_slice(b"junk");
    assert_eq!(h.dispatcher.handle(&msg).await, DispatchStatus::Ok);
    assert_eq!(h.transport.sends(), vec![(1, b"abc".to_vec())]);
}

#[tokio::test]
async fn test_protocol_codes_map_to_socket_kinds() {
    let h = harness();
    let host = || HostField::Ipv4([10, 0, 0, 1].into());

    h.dispatcher
        .handle(&open_msg(PROTOCOL_TYPE_TCP_IPV4, 1, 80, host()))
        .await;
    h.dispatcher
        .handle(&open_msg(PROTOCOL_TYPE_UDP_IPV4, 2, 53, host()))
        .await;
    h.dispatcher.handle(&open_msg(7, 3, 80, host())).await;

    let kinds: Vec<SocketKind> = h.transport.connects().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![SocketKind::Stream, SocketKind::Datagram, SocketKind::Stream]
    );
}

#[tokio::test]
async fn test_hostname_open_connects_by_name() {
    let h = harness();
    let msg = open_msg(
        PROTOCOL_TYPE_TCP_IPV4,
        7,
        16993,
        HostField::Hostname("amt.example.com".to_string()),
    );

    assert_eq!(h.dispatcher.handle(&msg).await, DispatchStatus::Ok);
    let connects = h.transport.connects();
    assert_eq!(connects[0].host, "amt.example.com");
    assert_eq!(connects[0].port, 16993);
}

#[tokio::test]
async fn test_ip_fqdn_updates_identity_cache() {
    let h = harness();

    let status = h.dispatcher.handle(&fqdn_msg("host.corp.example")).await;
    assert_eq!(status, DispatchStatus::Ok);
    assert_eq!(h.identity.fqdn().as_deref(), Some("host.corp.example"));

    assert_eq!(h.dispatcher.handle(&fqdn_msg("")).await, DispatchStatus::Ok);
    assert_eq!(h.identity.fqdn(), None);
}

#[tokio::test]
async fn test_identity_failure_still_returns_ok() {
    let transport = Arc::new(MockSocketTransport::new());
    let dispatcher = ProtocolDispatcher::new(
        &Config::default(),
        Arc::clone(&transport),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FailingIdentity),
    );

    let status = dispatcher.handle(&fqdn_msg("host.corp.example")).await;
    assert_eq!(status, DispatchStatus::Ok);
    assert_eq!(dispatcher.metrics().snapshot().identity_update_failures, 1);
    assert!(dispatcher.registry().is_empty().await);
}

#[tokio::test]
async fn test_open_close_leaves_registry_as_before() {
    let h = harness();
    h.dispatcher.handle(&open_tcp(1, [10, 0, 0, 1], 80)).await;

    let registry = h.dispatcher.registry();
    let before = {
        let state = registry.lock().await;
        let mut ids = state.local_ids();
        ids.sort_unstable();
        ids
    };

    h.dispatcher.handle(&open_tcp(2, [10, 0, 0, 2], 80)).await;
    h.dispatcher.handle(&send_msg(2, b"ping")).await;
    h.dispatcher.handle(&close_msg(2)).await;

    let state = registry.lock().await;
    let mut after = state.local_ids();
    after.sort_unstable();
    assert_eq!(before, after);
    assert!(state.contains_peer(1));
    assert!(!state.contains_peer(2));
    state.assert_consistent();
}
