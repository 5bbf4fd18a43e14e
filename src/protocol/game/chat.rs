//! Chat message handling.
//!
//! Handles SMSG_MESSAGECHAT parsing, channel joins, name queries and
//! CMSG_MESSAGECHAT sending.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::error::ProtocolError;
use crate::protocol::packets::opcodes::{CMSG_JOIN_CHANNEL, CMSG_MESSAGECHAT, CMSG_NAME_QUERY};
use crate::protocol::packets::{
    ensure_remaining, read_cstring, Packet, PacketDecode, PacketEncode, MAX_CSTRING_LONG,
    MAX_CSTRING_SHORT,
};

/// Chat events (message types) from WoW protocol.
#[allow(dead_code)]
pub mod chat_events {
    pub const CHAT_MSG_SYSTEM: u8 = 0x00;
    pub const CHAT_MSG_SAY: u8 = 0x01;
    pub const CHAT_MSG_PARTY: u8 = 0x02;
    pub const CHAT_MSG_RAID: u8 = 0x03;
    pub const CHAT_MSG_GUILD: u8 = 0x04;
    pub const CHAT_MSG_OFFICER: u8 = 0x05;
    pub const CHAT_MSG_YELL: u8 = 0x06;
    pub const CHAT_MSG_WHISPER: u8 = 0x07;
    pub const CHAT_MSG_WHISPER_INFORM: u8 = 0x09;
    pub const CHAT_MSG_EMOTE: u8 = 0x0A;
    pub const CHAT_MSG_CHANNEL: u8 = 0x11;
    pub const CHAT_MSG_RAID_LEADER: u8 = 0x27;
    pub const CHAT_MSG_RAID_WARNING: u8 = 0x28;
    pub const CHAT_MSG_PARTY_LEADER: u8 = 0x33;
}

/// Channel notification types.
#[allow(dead_code)]
pub mod chat_notify {
    pub const CHAT_JOINED_NOTICE: u8 = 0x00;
    pub const CHAT_LEFT_NOTICE: u8 = 0x01;
    pub const CHAT_YOU_JOINED_NOTICE: u8 = 0x02;
    pub const CHAT_YOU_LEFT_NOTICE: u8 = 0x03;
    pub const CHAT_WRONG_PASSWORD_NOTICE: u8 = 0x04;
    pub const CHAT_NOT_MEMBER_NOTICE: u8 = 0x05;
    pub const CHAT_MUTED_NOTICE: u8 = 0x11;
    pub const CHAT_BANNED_NOTICE: u8 = 0x13;
    pub const CHAT_WRONG_FACTION_NOTICE: u8 = 0x1A;
    pub const CHAT_INVALID_NAME_NOTICE: u8 = 0x1B;
    pub const CHAT_THROTTLED_NOTICE: u8 = 0x1F;
    pub const CHAT_NOT_IN_AREA_NOTICE: u8 = 0x20;
}

/// Language IDs for chat messages.
#[allow(dead_code)]
pub mod languages {
    pub const LANG_UNIVERSAL: u32 = 0;
    pub const LANG_ORCISH: u32 = 1;
    pub const LANG_COMMON: u32 = 7;
    pub const LANG_ADDON: u32 = 0xFFFFFFFF;
}

/// SMSG_MESSAGECHAT / SMSG_GM_MESSAGECHAT packet data.
#[derive(Debug, Clone)]
pub struct MessageChat {
    pub chat_type: u8,
    pub language: u32,
    pub sender_guid: u64,
    pub channel_name: Option<String>,
    pub message: String,
}

impl MessageChat {
    /// Decode a chat packet. Returns `None` for messages the bridge never relays
    /// (addon traffic and chat types without a regular body).
    pub fn decode_chat(buf: &mut Bytes, is_gm: bool) -> Result<Option<Self>, ProtocolError> {
        ensure_remaining(buf, 13)?;

        let chat_type = buf.get_u8();
        let language = buf.get_u32_le();

        if !matches!(
            chat_type,
            chat_events::CHAT_MSG_SYSTEM..=chat_events::CHAT_MSG_WHISPER
                | chat_events::CHAT_MSG_WHISPER_INFORM
                | chat_events::CHAT_MSG_EMOTE
                | chat_events::CHAT_MSG_CHANNEL
                | chat_events::CHAT_MSG_RAID_LEADER
                | chat_events::CHAT_MSG_RAID_WARNING
                | chat_events::CHAT_MSG_PARTY_LEADER
        ) {
            return Ok(None);
        }

        if language == languages::LANG_ADDON {
            return Ok(None);
        }

        let sender_guid = buf.get_u64_le();

        ensure_remaining(buf, 4)?;
        buf.advance(4);

        // GM messages carry the sender's name length and name
        if is_gm {
            ensure_remaining(buf, 4)?;
            buf.advance(4);
            read_cstring(buf, MAX_CSTRING_SHORT)?;
        }

        let channel_name = if chat_type == chat_events::CHAT_MSG_CHANNEL {
            Some(read_cstring(buf, MAX_CSTRING_SHORT)?)
        } else {
            None
        };

        // Target GUID, then the message length including its terminator
        ensure_remaining(buf, 12)?;
        buf.advance(8);
        let message_length = buf.get_u32_le() as usize;
        let msg_len = message_length.saturating_sub(1);

        ensure_remaining(buf, msg_len)?;
        let message_bytes = buf.copy_to_bytes(msg_len);
        let message = String::from_utf8_lossy(&message_bytes).into_owned();

        // Terminator and chat tag
        buf.advance(buf.remaining().min(2));

        Ok(Some(MessageChat {
            chat_type,
            language,
            sender_guid,
            channel_name,
            message,
        }))
    }
}

/// CMSG_MESSAGECHAT packet for sending chat messages.
#[derive(Debug, Clone)]
pub struct SendChatMessage {
    pub chat_type: u8,
    pub language: u32,
    pub target: Option<String>,
    pub message: String,
}

impl PacketEncode for SendChatMessage {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.chat_type as u32);
        buf.put_u32_le(self.language);

        // For whisper/channel, write target first
        if let Some(ref target) = self.target {
            buf.put_slice(target.as_bytes());
            buf.put_u8(0);
        }

        buf.put_slice(self.message.as_bytes());
        buf.put_u8(0);
    }
}

impl From<SendChatMessage> for Packet {
    fn from(msg: SendChatMessage) -> Self {
        Packet::encode(CMSG_MESSAGECHAT, &msg)
    }
}

/// CMSG_JOIN_CHANNEL packet.
#[derive(Debug, Clone)]
pub struct JoinChannel {
    pub channel_id: u32,
    pub channel_name: String,
    pub password: String,
}

impl JoinChannel {
    /// Join a custom (non-zone) channel without a password.
    pub fn custom(channel_name: &str) -> Self {
        Self {
            channel_id: 0,
            channel_name: channel_name.to_string(),
            password: String::new(),
        }
    }
}

impl PacketEncode for JoinChannel {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.channel_id);
        // has voice, unknown
        buf.put_u8(0);
        buf.put_u8(0);

        buf.put_slice(self.channel_name.as_bytes());
        buf.put_u8(0);

        buf.put_slice(self.password.as_bytes());
        buf.put_u8(0);
    }
}

impl From<JoinChannel> for Packet {
    fn from(join: JoinChannel) -> Self {
        Packet::encode(CMSG_JOIN_CHANNEL, &join)
    }
}

/// SMSG_CHANNEL_NOTIFY packet data.
#[derive(Debug, Clone)]
pub struct ChannelNotify {
    pub notify_type: u8,
    pub channel_name: String,
}

impl ChannelNotify {
    /// Get a human-readable description of the notification.
    pub fn description(&self) -> String {
        match self.notify_type {
            chat_notify::CHAT_YOU_JOINED_NOTICE => {
                format!("Joined channel: [{}]", self.channel_name)
            }
            chat_notify::CHAT_YOU_LEFT_NOTICE => {
                format!("Left channel: [{}]", self.channel_name)
            }
            chat_notify::CHAT_WRONG_PASSWORD_NOTICE => {
                format!("Wrong password for channel: {}", self.channel_name)
            }
            chat_notify::CHAT_MUTED_NOTICE => {
                format!(
                    "[{}] You do not have permission to speak",
                    self.channel_name
                )
            }
            chat_notify::CHAT_BANNED_NOTICE => {
                format!("[{}] You are banned from that channel", self.channel_name)
            }
            chat_notify::CHAT_WRONG_FACTION_NOTICE => {
                format!("Wrong faction for channel: {}", self.channel_name)
            }
            chat_notify::CHAT_INVALID_NAME_NOTICE => "Invalid channel name".to_string(),
            chat_notify::CHAT_THROTTLED_NOTICE => {
                format!("[{}] Message rate limited, please wait", self.channel_name)
            }
            chat_notify::CHAT_NOT_IN_AREA_NOTICE => format!(
                "[{}] You are not in the correct area for this channel",
                self.channel_name
            ),
            _ => format!(
                "Channel notification {} for {}",
                self.notify_type, self.channel_name
            ),
        }
    }

    /// Whether the notice is routine membership traffic.
    pub fn is_routine(&self) -> bool {
        matches!(
            self.notify_type,
            chat_notify::CHAT_JOINED_NOTICE
                | chat_notify::CHAT_LEFT_NOTICE
                | chat_notify::CHAT_YOU_JOINED_NOTICE
                | chat_notify::CHAT_YOU_LEFT_NOTICE
        )
    }
}

impl PacketDecode for ChannelNotify {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, 2)?;
        let notify_type = buf.get_u8();
        let channel_name = read_cstring(buf, MAX_CSTRING_SHORT)?;

        Ok(ChannelNotify {
            notify_type,
            channel_name,
        })
    }
}

/// CMSG_NAME_QUERY packet.
#[derive(Debug, Clone)]
pub struct NameQuery {
    pub guid: u64,
}

impl PacketEncode for NameQuery {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.guid);
    }
}

impl From<NameQuery> for Packet {
    fn from(query: NameQuery) -> Self {
        Packet::encode(CMSG_NAME_QUERY, &query)
    }
}

/// SMSG_NAME_QUERY_RESPONSE packet data.
#[derive(Debug, Clone)]
pub struct NameQueryResponse {
    pub guid: u64,
    /// `None` when the server does not know the GUID.
    pub name: Option<String>,
}

impl PacketDecode for NameQueryResponse {
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let guid = read_packed_guid(buf)?;

        ensure_remaining(buf, 1)?;
        let name_known = buf.get_u8();

        let name = if name_known == 0 {
            Some(read_cstring(buf, MAX_CSTRING_LONG)?)
        } else {
            None
        };

        Ok(NameQueryResponse { guid, name })
    }
}

/// Read a packed GUID: a mask byte followed by the non-zero bytes it flags.
pub fn read_packed_guid(buf: &mut Bytes) -> Result<u64, ProtocolError> {
    ensure_remaining(buf, 1)?;
    let mask = buf.get_u8();
    let mut result = 0u64;

    for i in 0..8 {
        if mask & (1 << i) != 0 {
            ensure_remaining(buf, 1)?;
            result |= (buf.get_u8() as u64) << (i * 8);
        }
    }

    Ok(result)
}

/// Get the language ID for a race (for sending messages).
pub fn get_language_for_race(race: u8) -> u32 {
    match race {
        // Horde races
        2 | 5 | 6 | 8 | 10 => languages::LANG_ORCISH,
        // Alliance races and anything unknown
        _ => languages::LANG_COMMON,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode an SMSG_MESSAGECHAT body for a channel message.
    pub(crate) fn channel_message(sender: u64, channel: &str, text: &str) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(chat_events::CHAT_MSG_CHANNEL);
        buf.put_u32_le(languages::LANG_COMMON);
        buf.put_u64_le(sender);
        buf.put_u32_le(0);
        buf.put_slice(channel.as_bytes());
        buf.put_u8(0);
        buf.put_u64_le(0);
        buf.put_u32_le(text.len() as u32 + 1);
        buf.put_slice(text.as_bytes());
        buf.put_u8(0);
        buf.put_u8(0);
        buf.freeze()
    }

    #[test]
    fn test_decode_channel_message() {
        let mut payload = channel_message(77, "World", "hello there");
        let msg = MessageChat::decode_chat(&mut payload, false)
            .unwrap()
            .unwrap();
        assert_eq!(msg.sender_guid, 77);
        assert_eq!(msg.channel_name.as_deref(), Some("World"));
        assert_eq!(msg.message, "hello there");
    }

    #[test]
    fn test_decode_gm_message_skips_name() {
        let mut buf = BytesMut::new();
        buf.put_u8(chat_events::CHAT_MSG_CHANNEL);
        buf.put_u32_le(languages::LANG_UNIVERSAL);
        buf.put_u64_le(5);
        buf.put_u32_le(0);
        buf.put_u32_le(3);
        buf.put_slice(b"GM\0");
        buf.put_slice(b"World\0");
        buf.put_u64_le(0);
        buf.put_u32_le(3);
        buf.put_slice(b"hi\0");
        buf.put_u8(0);

        let msg = MessageChat::decode_chat(&mut buf.freeze(), true)
            .unwrap()
            .unwrap();
        assert_eq!(msg.channel_name.as_deref(), Some("World"));
        assert_eq!(msg.message, "hi");
    }

    #[test]
    fn test_addon_message_skipped() {
        let mut buf = BytesMut::new();
        buf.put_u8(chat_events::CHAT_MSG_GUILD);
        buf.put_u32_le(languages::LANG_ADDON);
        buf.put_bytes(0, 16);
        assert!(MessageChat::decode_chat(&mut buf.freeze(), false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_send_chat_message_encode() {
        let msg = SendChatMessage {
            chat_type: chat_events::CHAT_MSG_CHANNEL,
            language: languages::LANG_COMMON,
            target: Some("World".to_string()),
            message: "Hello".to_string(),
        };

        let mut buf = BytesMut::new();
        msg.encode(&mut buf);

        // chat type + language + "World\0" + "Hello\0"
        assert_eq!(buf.len(), 4 + 4 + 6 + 6);
    }

    #[test]
    fn test_join_channel_encode() {
        let mut buf = BytesMut::new();
        JoinChannel::custom("World").encode(&mut buf);

        // channel id + 2 flag bytes + "World\0" + empty password
        assert_eq!(buf.len(), 4 + 2 + 6 + 1);
    }

    #[test]
    fn test_name_query_response() {
        let mut buf = BytesMut::new();
        // Packed GUID 0x0102: mask 0b11
        buf.put_slice(&[0x03, 0x02, 0x01]);
        buf.put_u8(0);
        buf.put_slice(b"Thrall\0");
        buf.put_slice(b"\0");
        buf.put_slice(&[2, 0, 7]);

        let response = NameQueryResponse::decode(&mut buf.freeze()).unwrap();
        assert_eq!(response.guid, 0x0102);
        assert_eq!(response.name.as_deref(), Some("Thrall"));
    }

    #[test]
    fn test_language_for_race() {
        assert_eq!(get_language_for_race(2), languages::LANG_ORCISH);
        assert_eq!(get_language_for_race(1), languages::LANG_COMMON);
        assert_eq!(get_language_for_race(99), languages::LANG_COMMON);
    }
}
