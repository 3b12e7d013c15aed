//! Wire constants for the engine tunnel messages.

/// Size of the leading type tag.
pub const TAG_LEN: usize = 1;

/// Connection identifier field (u32).
pub const CONNECTION_ID_LEN: usize = 4;

/// Host port field of OpenConnectionEx (u16, network order).
pub const HOST_PORT_LEN: usize = 2;

/// SendData payload length field (u16, network order).
pub const DATA_LENGTH_LEN: usize = 2;

/// Raw IPv4 address occupying the host field when no hostname is present.
pub const IPV4_ADDR_LEN: usize = 4;

/// Upper bound of the hostname / FQDN fields, terminator included.
pub const FQDN_MAX_SIZE: usize = 256;

/// Flag bit in OpenConnectionEx telling that the host field holds a hostname.
pub const HOSTNAME_BIT: u8 = 0x01;

/// Protocol kind codes carried by OpenConnectionEx.
pub const PROTOCOL_TYPE_TCP_IPV4: u8 = 0x00;
pub const PROTOCOL_TYPE_UDP_IPV4: u8 = 0x01;

/// Fixed portion of OpenConnectionEx after the tag:
/// protocol(1) + flags(1) + connection_id(4) + port(2) + host(>=4).
pub const OPEN_CONNECTION_EX_MIN_LEN: usize =
    1 + 1 + CONNECTION_ID_LEN + HOST_PORT_LEN + IPV4_ADDR_LEN;

/// CloseConnection record after the tag.
pub const CLOSE_CONNECTION_LEN: usize = CONNECTION_ID_LEN;

/// Fixed portion of SendData after the tag (payload excluded).
pub const SEND_DATA_HEADER_LEN: usize = CONNECTION_ID_LEN + DATA_LENGTH_LEN;
