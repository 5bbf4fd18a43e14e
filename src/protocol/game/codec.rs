//! World server framing.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::common::error::ProtocolError;
use crate::protocol::packets::Packet;

/// Codec for world server packets.
///
/// Server headers are a big-endian size (3 bytes when the top bit is set,
/// otherwise 2) followed by a little-endian opcode. Client headers are a
/// big-endian size followed by the opcode as u16 until the session request has
/// gone out, and as u32 afterwards. Ascension world servers do not encrypt
/// headers, so there is no ARC4 stage.
#[derive(Debug, Default)]
pub struct WorldPacketCodec {
    session_started: bool,
}

impl WorldPacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to the post-CMSG_AUTH_SESSION client header layout.
    pub fn start_session(&mut self) {
        self.session_started = true;
    }
}

impl Decoder for WorldPacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let large = (src[0] & 0x80) != 0;
        let header_size = if large { 5 } else { 4 };

        if src.len() < header_size {
            return Ok(None);
        }

        let (size, opcode) = if large {
            let size = (((src[0] & 0x7F) as usize) << 16)
                | ((src[1] as usize) << 8)
                | (src[2] as usize);
            (size, u16::from_le_bytes([src[3], src[4]]))
        } else {
            let size = ((src[0] as usize) << 8) | (src[1] as usize);
            (size, u16::from_le_bytes([src[2], src[3]]))
        };

        // Size counts the opcode
        let payload_size = size.checked_sub(2).ok_or(ProtocolError::PacketTooShort {
            needed: 2,
            got: size,
        })?;

        if src.len() < header_size + payload_size {
            src.reserve(header_size + payload_size - src.len());
            return Ok(None);
        }

        src.advance(header_size);
        let payload = src.split_to(payload_size).freeze();

        Ok(Some(Packet { opcode, payload }))
    }
}

impl Encoder<Packet> for WorldPacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let opcode_size = if self.session_started { 4 } else { 2 };
        let total_size = item.payload.len() + opcode_size;

        dst.reserve(2 + total_size);
        dst.put_u16(total_size as u16);
        if self.session_started {
            dst.put_u32_le(item.opcode as u32);
        } else {
            dst.put_u16_le(item.opcode);
        }
        dst.put_slice(&item.payload);

        Ok(())
    }
}

/// A framed world server connection.
pub type WorldConnection<S> = Framed<S, WorldPacketCodec>;

/// Create a new world connection from a stream.
pub fn new_world_connection<S: AsyncRead + AsyncWrite>(stream: S) -> WorldConnection<S> {
    Framed::new(stream, WorldPacketCodec::new())
}
