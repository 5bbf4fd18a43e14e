//! Packet encoding and decoding traits.

use bytes::{Buf, Bytes, BytesMut};

use crate::common::error::ProtocolError;

/// Upper bound for names and channel strings.
pub const MAX_CSTRING_SHORT: usize = 256;
/// Upper bound for chat text and server messages.
pub const MAX_CSTRING_LONG: usize = 8192;

/// A WoW protocol packet.
#[derive(Debug, Clone)]
pub struct Packet {
    pub opcode: u16,
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet with the given opcode and payload.
    pub fn new(opcode: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Create an empty packet with just an opcode.
    pub fn empty(opcode: u16) -> Self {
        Self {
            opcode,
            payload: Bytes::new(),
        }
    }

    /// Encode a packet body into a packet with the given opcode.
    pub fn encode(opcode: u16, body: &impl PacketEncode) -> Self {
        let mut buf = BytesMut::new();
        body.encode(&mut buf);
        Self::new(opcode, buf.freeze())
    }
}

/// Trait for types that can be encoded into packet payload.
pub trait PacketEncode {
    fn encode(&self, buf: &mut BytesMut);
}

/// Trait for types that can be decoded from packet payload.
pub trait PacketDecode: Sized {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError>;
}

/// Fail with `PacketTooShort` unless `needed` bytes remain.
pub fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), ProtocolError> {
    if buf.remaining() < needed {
        return Err(ProtocolError::PacketTooShort {
            needed,
            got: buf.remaining(),
        });
    }
    Ok(())
}

/// Read a null-terminated string of at most `max_len` bytes.
pub fn read_cstring(buf: &mut impl Buf, max_len: usize) -> Result<String, ProtocolError> {
    let mut bytes = Vec::new();
    loop {
        if !buf.has_remaining() {
            return Err(ProtocolError::InvalidString {
                message: "Unterminated string".to_string(),
            });
        }
        let b = buf.get_u8();
        if b == 0 {
            break;
        }
        if bytes.len() == max_len {
            return Err(ProtocolError::InvalidString {
                message: format!("String exceeds {} bytes", max_len),
            });
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
