//! World server packet definitions.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::error::ProtocolError;
use crate::protocol::packets::opcodes::{
    CMSG_AUTH_SESSION, CMSG_CHAR_ENUM, CMSG_KEEP_ALIVE, CMSG_PING, CMSG_PLAYER_LOGIN,
    CMSG_TIME_SYNC_RESP,
};
use crate::protocol::packets::{
    ensure_remaining, read_cstring, Packet, PacketDecode, PacketEncode, MAX_CSTRING_SHORT,
};

/// Compressed addon info blob sent with the session request.
pub const ADDON_INFO: [u8; 216] = hex_literal::hex!("9e020000789c75d2c14ec3300cc6f1f0145c780fce744853a5e542c319b9c9476a3571aa341d6cd7bdd19e107103c93dff2c5bfacb8fc6982ef1f54a357cbcf889714686b4f7de3ce4afa793f9e71542ba6cbe7111d53aaa23ea3a9565875b4bf864a4605938d3a20db10496a82e38508204aa1a953c523b95b86b0edf4dc1578c5b74a5a455c1a33d4ca4173ada61ab675c744c9765d265e3143a9259d55ed6055e3fd837e4a1f8196d2f8f255f8b2a6fc44105f75b54bfe738c3925084d6db9519fa13b84a01c3cc29ed310bea5fbbdf9ee30fe33bc901");

/// SMSG_AUTH_RESPONSE code for a successful session.
pub const AUTH_OK: u8 = 0x0C;

/// Equipment slots listed per character in SMSG_CHAR_ENUM.
const CHAR_ENUM_EQUIPMENT_SLOTS: usize = 23;

/// SMSG_AUTH_CHALLENGE packet.
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    pub server_seed: u32,
}

impl PacketDecode for AuthChallenge {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 8)?;
        // Leading u32 is unused on this build
        buf.advance(4);
        let server_seed = buf.get_u32();
        Ok(AuthChallenge { server_seed })
    }
}

/// CMSG_AUTH_SESSION packet.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub build: u32,
    pub account: String,
    pub client_seed: u32,
    pub realm_id: u32,
    pub digest: [u8; 20],
}

impl PacketEncode for AuthSession {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.build);
        // Login server id
        buf.put_u32_le(0);
        buf.put_slice(self.account.as_bytes());
        buf.put_u8(0);
        // Login server type
        buf.put_u32(0);
        buf.put_u32(self.client_seed);
        // Region and battlegroup
        buf.put_u32_le(0);
        buf.put_u32_le(0);
        buf.put_u32_le(self.realm_id);
        // DOS response
        buf.put_u64_le(3);
        buf.put_slice(&self.digest);
        buf.put_slice(&ADDON_INFO);
    }
}

impl From<AuthSession> for Packet {
    fn from(auth: AuthSession) -> Self {
        Packet::encode(CMSG_AUTH_SESSION, &auth)
    }
}

/// SMSG_AUTH_RESPONSE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    Success,
    Failure(u8),
}

impl PacketDecode for AuthResponse {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 1)?;
        match buf.get_u8() {
            AUTH_OK => Ok(AuthResponse::Success),
            code => Ok(AuthResponse::Failure(code)),
        }
    }
}

/// A character in the account's roster.
#[derive(Debug, Clone)]
pub struct CharacterInfo {
    pub guid: u64,
    pub name: String,
    pub race: u8,
    pub class: u8,
    pub level: u8,
    pub guild_id: u32,
}

/// SMSG_CHAR_ENUM response.
#[derive(Debug, Clone)]
pub struct CharEnum {
    pub characters: Vec<CharacterInfo>,
}

impl PacketDecode for CharEnum {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 1)?;
        let count = buf.get_u8();
        let mut characters = Vec::with_capacity(count as usize);

        for _ in 0..count {
            ensure_remaining(buf, 8)?;
            let guid = buf.get_u64_le();
            let name = read_cstring(buf, MAX_CSTRING_SHORT)?;

            // race, class, gender, skin, face, hair style, hair color, facial hair, level
            ensure_remaining(buf, 9)?;
            let race = buf.get_u8();
            let class = buf.get_u8();
            buf.advance(6);
            let level = buf.get_u8();

            // zone, map, position, guild, flags, customize flags, first login, pet
            ensure_remaining(buf, 45)?;
            buf.advance(8 + 12);
            let guild_id = buf.get_u32_le();
            buf.advance(4 + 4 + 1 + 12);

            // display id, inventory type and enchant per slot
            ensure_remaining(buf, CHAR_ENUM_EQUIPMENT_SLOTS * 9)?;
            buf.advance(CHAR_ENUM_EQUIPMENT_SLOTS * 9);

            characters.push(CharacterInfo {
                guid,
                name,
                race,
                class,
                level,
                guild_id,
            });
        }

        Ok(CharEnum { characters })
    }
}

/// CMSG_CHAR_ENUM request packet (empty payload).
#[derive(Debug, Clone, Default)]
pub struct CharEnumRequest;

impl From<CharEnumRequest> for Packet {
    fn from(_: CharEnumRequest) -> Self {
        Packet::empty(CMSG_CHAR_ENUM)
    }
}

/// CMSG_PLAYER_LOGIN packet.
#[derive(Debug, Clone)]
pub struct PlayerLogin {
    pub guid: u64,
}

impl PacketEncode for PlayerLogin {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.guid);
    }
}

impl From<PlayerLogin> for Packet {
    fn from(login: PlayerLogin) -> Self {
        Packet::encode(CMSG_PLAYER_LOGIN, &login)
    }
}

/// SMSG_LOGIN_VERIFY_WORLD packet.
#[derive(Debug, Clone)]
pub struct LoginVerifyWorld {
    pub map_id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub o: f32,
}

impl PacketDecode for LoginVerifyWorld {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 20)?;
        Ok(LoginVerifyWorld {
            map_id: buf.get_u32_le(),
            x: buf.get_f32_le(),
            y: buf.get_f32_le(),
            z: buf.get_f32_le(),
            o: buf.get_f32_le(),
        })
    }
}

/// CMSG_PING packet.
#[derive(Debug, Clone)]
pub struct Ping {
    pub sequence: u32,
    pub latency: u32,
}

impl PacketEncode for Ping {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.sequence);
        buf.put_u32_le(self.latency);
    }
}

impl From<Ping> for Packet {
    fn from(ping: Ping) -> Self {
        Packet::encode(CMSG_PING, &ping)
    }
}

/// SMSG_PONG packet.
#[derive(Debug, Clone)]
pub struct Pong {
    pub sequence: u32,
}

impl PacketDecode for Pong {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 4)?;
        Ok(Pong {
            sequence: buf.get_u32_le(),
        })
    }
}

/// CMSG_KEEP_ALIVE packet (empty payload).
#[derive(Debug, Clone, Default)]
pub struct KeepAlive;

impl From<KeepAlive> for Packet {
    fn from(_: KeepAlive) -> Self {
        Packet::empty(CMSG_KEEP_ALIVE)
    }
}

/// SMSG_TIME_SYNC_REQ packet.
#[derive(Debug, Clone)]
pub struct TimeSyncRequest {
    pub counter: u32,
}

impl PacketDecode for TimeSyncRequest {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 4)?;
        Ok(TimeSyncRequest {
            counter: buf.get_u32_le(),
        })
    }
}

/// CMSG_TIME_SYNC_RESP packet.
#[derive(Debug, Clone)]
pub struct TimeSyncResponse {
    pub counter: u32,
    pub client_ticks: u32,
}

impl PacketEncode for TimeSyncResponse {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.counter);
        buf.put_u32_le(self.client_ticks);
    }
}

impl From<TimeSyncResponse> for Packet {
    fn from(resp: TimeSyncResponse) -> Self {
        Packet::encode(CMSG_TIME_SYNC_RESP, &resp)
    }
}
