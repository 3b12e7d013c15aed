//! Engine tunnel message codec.
//!
//! Messages arrive as complete buffers; the first byte is the type tag and
//! the rest is a fixed-layout record. Decoding borrows payload bytes from the
//! input buffer.

pub mod constants;
mod message;

pub use message::{
    decode_message, CloseConnection, HostField, IpFqdn, Message, MessageType, OpenConnectionEx,
    ProtocolKind, SendData,
};
