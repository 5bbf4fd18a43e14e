//! World packet handling logic.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use crate::common::error::ProtocolError;
use crate::common::ChatEvent;
use crate::protocol::game::chat::{
    chat_events, get_language_for_race, ChannelNotify, JoinChannel, MessageChat, NameQuery,
    NameQueryResponse, SendChatMessage,
};
use crate::protocol::game::packets::{
    AuthChallenge, AuthResponse, AuthSession, CharacterInfo, LoginVerifyWorld, Ping, PlayerLogin,
    TimeSyncRequest, TimeSyncResponse,
};
use crate::protocol::packets::opcodes::SMSG_GM_MESSAGECHAT;
use crate::protocol::packets::PacketDecode;

/// Result of processing one chat packet.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Ready to dispatch.
    Ready(ChatEvent),
    /// Held until the sender's name is known; a name query should go out.
    NeedsName(u64),
    /// Held behind a name query that is already in flight.
    Queued,
    /// Not relayed (own message, addon traffic, unsupported type).
    Ignored,
}

/// World protocol handler state.
pub struct WorldHandler {
    account: String,
    session_key: [u8; 40],
    realm_id: u32,
    build: u32,
    pub self_guid: Option<u64>,
    pub language_id: u32,
    pub in_world: bool,

    /// Cache of player names by GUID
    pub player_names: HashMap<u64, String>,
    /// Chat events waiting for name resolution
    pub pending_messages: HashMap<u64, Vec<ChatEvent>>,
    /// GUIDs with a name query in flight
    pub pending_name_queries: HashSet<u64>,
}

impl WorldHandler {
    pub fn new(account: &str, session_key: [u8; 40], realm_id: u32, build: u32) -> Self {
        Self {
            account: account.to_uppercase(),
            session_key,
            realm_id,
            build,
            self_guid: None,
            language_id: crate::protocol::game::chat::languages::LANG_COMMON,
            in_world: false,
            player_names: HashMap::new(),
            pending_messages: HashMap::new(),
            pending_name_queries: HashSet::new(),
        }
    }

    /// Handle SMSG_AUTH_CHALLENGE and build CMSG_AUTH_SESSION.
    pub fn handle_auth_challenge(&self, packet: AuthChallenge) -> AuthSession {
        let client_seed: u32 = rand::random();

        // SHA1(account + [0,0,0,0] + clientSeed + serverSeed + sessionKey)
        let mut hasher = Sha1::new();
        hasher.update(self.account.as_bytes());
        hasher.update([0, 0, 0, 0]);
        hasher.update(client_seed.to_be_bytes());
        hasher.update(packet.server_seed.to_be_bytes());
        hasher.update(self.session_key);
        let digest: [u8; 20] = hasher.finalize().into();

        debug!("Calculated auth digest for account {}", self.account);

        AuthSession {
            build: self.build,
            account: self.account.clone(),
            client_seed,
            realm_id: self.realm_id,
            digest,
        }
    }

    /// Handle SMSG_AUTH_RESPONSE. Returns the failure code on rejection.
    pub fn handle_auth_response(&self, packet: AuthResponse) -> Result<(), u8> {
        match packet {
            AuthResponse::Success => {
                info!("World auth successful");
                Ok(())
            }
            AuthResponse::Failure(code) => {
                warn!("World auth failed with code: 0x{:02X}", code);
                Err(code)
            }
        }
    }

    /// Find a character by name, ignoring case.
    pub fn find_character<'a>(
        roster: &'a [CharacterInfo],
        name: &str,
    ) -> Option<&'a CharacterInfo> {
        roster.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Select the character to play and build CMSG_PLAYER_LOGIN.
    pub fn build_player_login(&mut self, character: &CharacterInfo) -> PlayerLogin {
        self.self_guid = Some(character.guid);
        self.language_id = get_language_for_race(character.race);
        self.player_names
            .insert(character.guid, character.name.clone());
        PlayerLogin {
            guid: character.guid,
        }
    }

    /// Handle SMSG_LOGIN_VERIFY_WORLD.
    pub fn handle_login_verify_world(&mut self, packet: LoginVerifyWorld) {
        info!(
            "World login verified! Map: {}, X: {}, Y: {}, Z: {}",
            packet.map_id, packet.x, packet.y, packet.z
        );
        self.in_world = true;
    }

    /// Handle SMSG_TIME_SYNC_REQ.
    pub fn handle_time_sync_req(&self, packet: TimeSyncRequest, client_ticks: u32) -> TimeSyncResponse {
        TimeSyncResponse {
            counter: packet.counter,
            client_ticks,
        }
    }

    pub fn build_ping(&self, sequence: u32) -> Ping {
        Ping {
            sequence,
            latency: 0,
        }
    }

    // =========================================================================
    // Chat handling
    // =========================================================================

    /// Handle SMSG_MESSAGECHAT or SMSG_GM_MESSAGECHAT.
    pub fn handle_messagechat(
        &mut self,
        opcode: u16,
        mut payload: Bytes,
    ) -> Result<ChatOutcome, ProtocolError> {
        let is_gm = opcode == SMSG_GM_MESSAGECHAT;
        let msg = match MessageChat::decode_chat(&mut payload, is_gm)? {
            Some(msg) => msg,
            None => return Ok(ChatOutcome::Ignored),
        };

        // Ignore messages from self (except system messages)
        if self.self_guid == Some(msg.sender_guid) && msg.chat_type != chat_events::CHAT_MSG_SYSTEM
        {
            debug!("Ignoring message from self");
            return Ok(ChatOutcome::Ignored);
        }

        // System messages carry no sender
        if msg.sender_guid == 0 {
            return Ok(ChatOutcome::Ready(to_event(opcode, msg, String::new())));
        }

        if let Some(name) = self.player_names.get(&msg.sender_guid) {
            let name = name.clone();
            return Ok(ChatOutcome::Ready(to_event(opcode, msg, name)));
        }

        let guid = msg.sender_guid;
        self.pending_messages
            .entry(guid)
            .or_default()
            .push(to_event(opcode, msg, String::new()));

        if self.pending_name_queries.insert(guid) {
            debug!("Sender {} not in cache, need name query", guid);
            Ok(ChatOutcome::NeedsName(guid))
        } else {
            Ok(ChatOutcome::Queued)
        }
    }

    /// Handle SMSG_NAME_QUERY response, releasing held chat events.
    pub fn handle_name_query(&mut self, mut payload: Bytes) -> Result<Vec<ChatEvent>, ProtocolError> {
        let response = NameQueryResponse::decode(&mut payload)?;
        self.pending_name_queries.remove(&response.guid);

        let name = match response.name {
            Some(name) => name,
            None => {
                let dropped = self
                    .pending_messages
                    .remove(&response.guid)
                    .map_or(0, |m| m.len());
                debug!(
                    "Name for GUID {} unknown, dropping {} messages",
                    response.guid, dropped
                );
                return Ok(Vec::new());
            }
        };

        self.player_names.insert(response.guid, name.clone());

        let resolved: Vec<ChatEvent> = self
            .pending_messages
            .remove(&response.guid)
            .unwrap_or_default()
            .into_iter()
            .map(|mut event| {
                event.sender = name.clone();
                event
            })
            .collect();

        debug!(
            "Resolved name for GUID {}: {} ({} pending messages)",
            response.guid,
            name,
            resolved.len()
        );

        Ok(resolved)
    }

    pub fn build_name_query(&self, guid: u64) -> NameQuery {
        NameQuery { guid }
    }

    /// Handle SMSG_CHANNEL_NOTIFY.
    pub fn handle_channel_notify(&self, mut payload: Bytes) -> Result<(), ProtocolError> {
        let notify = ChannelNotify::decode(&mut payload)?;
        if notify.is_routine() {
            info!("{}", notify.description());
        } else {
            warn!("{}", notify.description());
        }
        Ok(())
    }

    pub fn build_join_channel(&self, channel_name: &str) -> JoinChannel {
        JoinChannel::custom(channel_name)
    }

    /// Build a CMSG_MESSAGECHAT for a custom channel.
    pub fn build_channel_message(&self, message: &str, channel: &str) -> SendChatMessage {
        SendChatMessage {
            chat_type: chat_events::CHAT_MSG_CHANNEL,
            language: self.language_id,
            target: Some(channel.to_string()),
            message: message.to_string(),
        }
    }
}

fn to_event(opcode: u16, msg: MessageChat, sender: String) -> ChatEvent {
    ChatEvent {
        opcode,
        chat_type: msg.chat_type,
        channel: msg.channel_name,
        sender,
        text: msg.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::game::chat::tests::channel_message;
    use crate::protocol::packets::opcodes::SMSG_MESSAGECHAT;
    use bytes::{BufMut, BytesMut};

    fn handler() -> WorldHandler {
        WorldHandler::new("bridge", [0u8; 40], 1, 12340)
    }

    fn name_response(guid: u8, name: &str) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0x01, guid, 0]);
        buf.put_slice(name.as_bytes());
        buf.put_slice(b"\0\0");
        buf.put_slice(&[1, 0, 1]);
        buf.freeze()
    }

    #[test]
    fn test_auth_session_fields() {
        let handler = handler();
        let session = handler.handle_auth_challenge(AuthChallenge { server_seed: 1 });
        assert_eq!(session.account, "BRIDGE");
        assert_eq!(session.build, 12340);
        assert_eq!(session.realm_id, 1);
    }

    #[test]
    fn test_find_character_ignores_case() {
        let roster = vec![CharacterInfo {
            guid: 3,
            name: "Relay".to_string(),
            race: 2,
            class: 1,
            level: 80,
            guild_id: 0,
        }];
        assert!(WorldHandler::find_character(&roster, "relay").is_some());
        assert!(WorldHandler::find_character(&roster, "Other").is_none());

        let mut handler = handler();
        handler.build_player_login(&roster[0]);
        assert_eq!(handler.self_guid, Some(3));
        assert_eq!(
            handler.language_id,
            crate::protocol::game::chat::languages::LANG_ORCISH
        );
    }

    #[test]
    fn test_own_messages_ignored() {
        let mut handler = handler();
        handler.self_guid = Some(9);
        let outcome = handler
            .handle_messagechat(SMSG_MESSAGECHAT, channel_message(9, "World", "echo"))
            .unwrap();
        assert_eq!(outcome, ChatOutcome::Ignored);
    }

    #[test]
    fn test_unknown_sender_waits_for_name() {
        let mut handler = handler();

        let first = handler
            .handle_messagechat(SMSG_MESSAGECHAT, channel_message(5, "World", "one"))
            .unwrap();
        assert_eq!(first, ChatOutcome::NeedsName(5));

        let second = handler
            .handle_messagechat(SMSG_MESSAGECHAT, channel_message(5, "World", "two"))
            .unwrap();
        assert_eq!(second, ChatOutcome::Queued);

        let resolved = handler.handle_name_query(name_response(5, "Thrall")).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].sender, "Thrall");
        assert_eq!(resolved[1].text, "two");
        assert!(handler.pending_messages.is_empty());

        // Cached from now on
        match handler
            .handle_messagechat(SMSG_MESSAGECHAT, channel_message(5, "World", "three"))
            .unwrap()
        {
            ChatOutcome::Ready(event) => {
                assert_eq!(event.sender, "Thrall");
                assert_eq!(event.opcode, SMSG_MESSAGECHAT);
                assert_eq!(event.channel.as_deref(), Some("World"));
            }
            other => panic!("expected ready event, got {:?}", other),
        }
    }

    #[test]
    fn test_channel_message_uses_race_language() {
        let handler = handler();
        let msg = handler.build_channel_message("hi", "World");
        assert_eq!(msg.target.as_deref(), Some("World"));
        assert_eq!(msg.chat_type, chat_events::CHAT_MSG_CHANNEL);
    }
}
