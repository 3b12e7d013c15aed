//! Common test utilities for dispatcher scenarios
#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::ProtocolDispatcher;
use crate::identity::{FqdnCache, IdentityCache};
use crate::mock::{MockSocketTransport, RecordingNotifier};
use crate::protocol::constants::{HOSTNAME_BIT, PROTOCOL_TYPE_TCP_IPV4};
use crate::protocol::{
    CloseConnection, HostField, IpFqdn, Message, OpenConnectionEx, SendData,
};

pub type TestDispatcher = ProtocolDispatcher<MockSocketTransport, Arc<RecordingNotifier>>;

pub struct Harness {
    pub dispatcher: TestDispatcher,
    pub transport: Arc<MockSocketTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub identity: Arc<FqdnCache>,
}

pub fn harness() -> Harness {
    harness_with(Config::default())
}

pub fn harness_with(config: Config) -> Harness {
    let transport = Arc::new(MockSocketTransport::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let identity = Arc::new(FqdnCache::new());
    let dispatcher = ProtocolDispatcher::new(
        &config,
        Arc::clone(&transport),
        Arc::clone(&notifier),
        identity.clone(),
    );
    Harness {
        dispatcher,
        transport,
        notifier,
        identity,
    }
}

/// Config whose local id space holds only `max` channels
pub fn config_with_max_channels(max: u32) -> Config {
    let mut config = Config::default();
    config.channels.max_channel_id = max;
    config
}

// Identity cache that refuses every update
pub struct FailingIdentity;

#[async_trait::async_trait]
impl IdentityCache for FailingIdentity {
    async fn update_fqdn(&self, _fqdn: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("identity store unavailable"))
    }
}

pub fn open_msg(protocol: u8, connection_id: u32, port: u16, host: HostField) -> Vec<u8> {
    let flags = match host {
        HostField::Hostname(_) => HOSTNAME_BIT,
        HostField::Ipv4(_) => 0,
    };
    Message::OpenConnectionEx(OpenConnectionEx {
        protocol,
        flags,
        connection_id,
        port,
        host,
    })
    .encode()
    .expect("test message encodes")
    .to_vec()
}

pub fn open_tcp(connection_id: u32, addr: [u8; 4], port: u16) -> Vec<u8> {
    open_msg(
        PROTOCOL_TYPE_TCP_IPV4,
        connection_id,
        port,
        HostField::Ipv4(Ipv4Addr::from(addr)),
    )
}

pub fn close_msg(connection_id: u32) -> Vec<u8> {
    Message::CloseConnection(CloseConnection { connection_id })
        .encode()
        .expect("test message encodes")
        .to_vec()
}

pub fn send_msg(connection_id: u32, data: &[u8]) -> Vec<u8> {
    Message::SendData(SendData {
        connection_id,
        data,
    })
    .encode()
    .expect("test message encodes")
    .to_vec()
}

pub fn fqdn_msg(fqdn: &str) -> Vec<u8> {
    Message::IpFqdn(IpFqdn {
        fqdn: fqdn.to_string(),
    })
    .encode()
    .expect("test message encodes")
    .to_vec()
}
