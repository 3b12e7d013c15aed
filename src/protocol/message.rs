/* ----------------------------------------------------------------------------------------------
 *   Wire format (all multi-byte integers big-endian)
 *
 *   OpenConnectionEx (0x08)
 *   ┌────────┬─────────────┬──────────┬──────────────┬────────────┬──────────────────────────┐
 *   │ Tag(1) │ Protocol(1) │ Flags(1) │ ConnId(4)    │ Port(2)    │ Host: IPv4(4) | name\0   │
 *   └────────┴─────────────┴──────────┴──────────────┴────────────┴──────────────────────────┘
 *   CloseConnection (0x03)     ┌────────┬───────────┐
 *                              │ Tag(1) │ ConnId(4) │
 *                              └────────┴───────────┘
 *   SendData (0x04)            ┌────────┬───────────┬─────────┬───────────────┐
 *                              │ Tag(1) │ ConnId(4) │ Len(2)  │ Data[Len]     │
 *                              └────────┴───────────┴─────────┴───────────────┘
 *   IpFqdn (0x05)              ┌────────┬──────────────────┐
 *                              │ Tag(1) │ fqdn\0 (<= 256)  │
 *                              └────────┴──────────────────┘
 * ------------------------------------------------------------------------------------------- */
use bytes::{Buf, BufMut, BytesMut};
use std::net::Ipv4Addr;

use super::constants::*;
use crate::error::{BridgeError, Result};

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MessageType {
    CloseConnection = 0x03,
    SendData = 0x04,
    IpFqdn = 0x05,
    OpenConnectionEx = 0x08,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::CloseConnection => write!(f, "CloseConnection"),
            MessageType::SendData => write!(f, "SendData"),
            MessageType::IpFqdn => write!(f, "IpFqdn"),
            MessageType::OpenConnectionEx => write!(f, "OpenConnectionEx"),
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = BridgeError;
    fn try_from(raw: u8) -> Result<Self> {
        use MessageType::*;
        match raw {
            0x03 => Ok(CloseConnection),
            0x04 => Ok(SendData),
            0x05 => Ok(IpFqdn),
            0x08 => Ok(OpenConnectionEx),
            _ => Err(BridgeError::UnknownMessageType(raw)),
        }
    }
}

/// Transport requested by an OpenConnectionEx message.
///
/// Anything other than UDP is treated as TCP, including codes this bridge
/// does not know about.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProtocolKind {
    Tcp,
    Udp,
}

impl ProtocolKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            PROTOCOL_TYPE_UDP_IPV4 => ProtocolKind::Udp,
            _ => ProtocolKind::Tcp,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            ProtocolKind::Tcp => PROTOCOL_TYPE_TCP_IPV4,
            ProtocolKind::Udp => PROTOCOL_TYPE_UDP_IPV4,
        }
    }
}

/// Destination carried in the shared host field.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HostField {
    Ipv4(Ipv4Addr),
    Hostname(String),
}

impl HostField {
    /// String handed to the socket transport: the hostname as given, or
    /// the dotted-decimal rendering of the raw address.
    pub fn destination(&self) -> String {
        match self {
            HostField::Ipv4(addr) => addr.to_string(),
            HostField::Hostname(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OpenConnectionEx {
    /// Raw protocol code as received; see [`ProtocolKind::from_code`].
    pub protocol: u8,
    pub flags: u8,
    pub connection_id: u32,
    /// Host byte order.
    pub port: u16,
    pub host: HostField,
}

impl OpenConnectionEx {
    pub fn protocol_kind(&self) -> ProtocolKind {
        ProtocolKind::from_code(self.protocol)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CloseConnection {
    pub connection_id: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SendData<'a> {
    pub connection_id: u32,
    pub data: &'a [u8],
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IpFqdn {
    pub fqdn: String,
}

/// One decoded inbound message. Payload bytes borrow from the input buffer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Message<'a> {
    OpenConnectionEx(OpenConnectionEx),
    CloseConnection(CloseConnection),
    SendData(SendData<'a>),
    IpFqdn(IpFqdn),
}

impl Message<'_> {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::OpenConnectionEx(_) => MessageType::OpenConnectionEx,
            Message::CloseConnection(_) => MessageType::CloseConnection,
            Message::SendData(_) => MessageType::SendData,
            Message::IpFqdn(_) => MessageType::IpFqdn,
        }
    }

    /// Encode into the wire layout. Used by tools and tests that play the
    /// engine side.
    ///
    /// Fails when a field does not fit its wire width: a payload over
    /// `u16::MAX` bytes, or a name that would not fit in `FQDN_MAX_SIZE`
    /// with its terminator.
    pub fn encode(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.message_type() as u8);
        match self {
            Message::OpenConnectionEx(msg) => {
                buf.put_u8(msg.protocol);
                buf.put_u8(msg.flags);
                buf.put_u32(msg.connection_id);
                buf.put_u16(msg.port);
                match &msg.host {
                    HostField::Ipv4(addr) => buf.extend_from_slice(&addr.octets()),
                    HostField::Hostname(name) => {
                        ensure_fits_c_string("hostname", name)?;
                        let start = buf.len();
                        buf.extend_from_slice(name.as_bytes());
                        buf.put_u8(0);
                        // The host field is never shorter than an IPv4 address
                        while buf.len() - start < IPV4_ADDR_LEN {
                            buf.put_u8(0);
                        }
                    }
                }
            }
            Message::CloseConnection(msg) => {
                buf.put_u32(msg.connection_id);
            }
            Message::SendData(msg) => {
                buf.put_u32(msg.connection_id);
                let data_len = u16::try_from(msg.data.len()).map_err(|_| {
                    BridgeError::Protocol(format!(
                        "SendData payload of {} bytes exceeds {}",
                        msg.data.len(),
                        u16::MAX
                    ))
                })?;
                buf.put_u16(data_len);
                buf.extend_from_slice(msg.data);
            }
            Message::IpFqdn(msg) => {
                ensure_fits_c_string("FQDN", &msg.fqdn)?;
                buf.extend_from_slice(msg.fqdn.as_bytes());
                buf.put_u8(0);
            }
        }
        Ok(buf)
    }
}

/// Decode one complete message.
///
/// Every field is length-checked before it is read; a buffer shorter than
/// the fixed portion of its record, or a SendData whose declared length runs
/// past the buffer, is an error.
pub fn decode_message(buf: &[u8]) -> Result<Message<'_>> {
    let (&tag, body) = buf
        .split_first()
        .ok_or_else(|| BridgeError::Protocol("empty message".to_string()))?;

    match MessageType::try_from(tag)? {
        MessageType::OpenConnectionEx => decode_open_connection_ex(body).map(Message::OpenConnectionEx),
        MessageType::CloseConnection => decode_close_connection(body).map(Message::CloseConnection),
        MessageType::SendData => decode_send_data(body).map(Message::SendData),
        MessageType::IpFqdn => decode_ip_fqdn(body).map(Message::IpFqdn),
    }
}

fn ensure_fits_c_string(what: &str, value: &str) -> Result<()> {
    if value.len() >= FQDN_MAX_SIZE || value.as_bytes().contains(&0) {
        return Err(BridgeError::Protocol(format!(
            "{} of {} bytes cannot be encoded",
            what,
            value.len()
        )));
    }
    Ok(())
}

fn ensure_len(message: &'static str, needed: usize, actual: usize) -> Result<()> {
    if actual < needed {
        return Err(BridgeError::Truncated {
            message,
            needed,
            actual,
        });
    }
    Ok(())
}

fn decode_open_connection_ex(body: &[u8]) -> Result<OpenConnectionEx> {
    ensure_len("OpenConnectionEx", OPEN_CONNECTION_EX_MIN_LEN, body.len())?;

    let mut cursor = body;
    let protocol = cursor.get_u8();
    let flags = cursor.get_u8();
    let connection_id = cursor.get_u32();
    let port = cursor.get_u16();

    let host = if flags & HOSTNAME_BIT != 0 {
        let name = read_c_string(cursor, "hostname")?;
        if name.is_empty() {
            return Err(BridgeError::Protocol(format!(
                "empty hostname in OpenConnectionEx for connection {}",
                connection_id
            )));
        }
        HostField::Hostname(name)
    } else {
        let mut octets = [0u8; IPV4_ADDR_LEN];
        cursor.copy_to_slice(&mut octets);
        HostField::Ipv4(Ipv4Addr::from(octets))
    };

    Ok(OpenConnectionEx {
        protocol,
        flags,
        connection_id,
        port,
        host,
    })
}

fn decode_close_connection(body: &[u8]) -> Result<CloseConnection> {
    ensure_len("CloseConnection", CLOSE_CONNECTION_LEN, body.len())?;
    let mut cursor = body;
    Ok(CloseConnection {
        connection_id: cursor.get_u32(),
    })
}

fn decode_send_data(body: &[u8]) -> Result<SendData<'_>> {
    ensure_len("SendData", SEND_DATA_HEADER_LEN, body.len())?;
    let mut cursor = body;
    let connection_id = cursor.get_u32();
    let data_len = cursor.get_u16() as usize;

    let payload = &body[SEND_DATA_HEADER_LEN..];
    ensure_len("SendData", SEND_DATA_HEADER_LEN + data_len, body.len())?;

    Ok(SendData {
        connection_id,
        data: &payload[..data_len],
    })
}

fn decode_ip_fqdn(body: &[u8]) -> Result<IpFqdn> {
    Ok(IpFqdn {
        fqdn: read_c_string(body, "FQDN")?,
    })
}

/// Read a NUL-terminated string bounded by `FQDN_MAX_SIZE` and the buffer
/// end. A missing terminator is tolerated when the buffer ends first.
fn read_c_string(field: &[u8], what: &str) -> Result<String> {
    let window = &field[..field.len().min(FQDN_MAX_SIZE)];
    let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
    if end == FQDN_MAX_SIZE {
        return Err(BridgeError::Protocol(format!(
            "{} longer than {} bytes",
            what,
            FQDN_MAX_SIZE - 1
        )));
    }
    String::from_utf8(window[..end].to_vec())
        .map_err(|e| BridgeError::Protocol(format!("invalid UTF-8 in {}: {}", what, e)))
}
