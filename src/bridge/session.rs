//! Collaborator contracts for the bridge worker.
//!
//! The worker drives a realm logon and a world session through these traits so
//! the state machine can be exercised without a game server.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::error::{RealmError, WorldError};
use crate::common::ChatEvent;
use crate::config::types::GameConfig;
use crate::protocol::packets::opcodes::{SMSG_GM_MESSAGECHAT, SMSG_MESSAGECHAT};
use crate::protocol::version::GameVersion;

/// Immutable credentials and endpoints for the game side.
#[derive(Clone)]
pub struct SessionConfig {
    pub realm_host: String,
    pub realm_port: u16,
    pub realm_name: String,
    pub account: String,
    pub password: String,
    pub character: String,
    pub channel: String,
    pub version: GameVersion,
}

impl SessionConfig {
    pub fn from_config(game: &GameConfig, version: GameVersion) -> Self {
        Self {
            realm_host: game.realm.host.clone(),
            realm_port: game.realm.port,
            realm_name: game.realm.name.clone(),
            account: game.account.username.clone(),
            password: game.account.password.clone(),
            character: game.character.clone(),
            channel: game.channel.clone(),
            version,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("realm_host", &self.realm_host)
            .field("realm_port", &self.realm_port)
            .field("realm_name", &self.realm_name)
            .field("account", &self.account)
            .field("character", &self.character)
            .field("channel", &self.channel)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// World server descriptor from the realm list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmEndpoint {
    pub host: String,
    pub port: u16,
    pub id: u32,
}

/// Realm name to world server descriptor.
pub type RealmDirectory = HashMap<String, RealmEndpoint>;

/// Session key negotiated with the realm server.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(pub [u8; 40]);

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Outcome of a successful realm logon.
#[derive(Debug, Clone)]
pub struct RealmLogon {
    pub realms: RealmDirectory,
    pub session_key: SessionKey,
}

/// The two chat packet kinds the bridge listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    MessageChat,
    GmMessageChat,
}

impl ChatKind {
    pub const ALL: [ChatKind; 2] = [ChatKind::MessageChat, ChatKind::GmMessageChat];

    pub fn opcode(self) -> u16 {
        match self {
            ChatKind::MessageChat => SMSG_MESSAGECHAT,
            ChatKind::GmMessageChat => SMSG_GM_MESSAGECHAT,
        }
    }

    pub fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode {
            SMSG_MESSAGECHAT => Some(ChatKind::MessageChat),
            SMSG_GM_MESSAGECHAT => Some(ChatKind::GmMessageChat),
            _ => None,
        }
    }
}

/// Callback invoked by a world session for each decoded chat event.
pub type ChatHandler = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

/// Opens realm and world sessions.
#[async_trait]
pub trait GameConnector: Send + Sync + 'static {
    type World: WorldSession;

    /// Authenticate against the realm server and fetch the realm list.
    async fn logon(&self, config: &SessionConfig) -> Result<RealmLogon, RealmError>;

    /// Connect to a world server and start its session. Account and client
    /// version come from the same `config` that was used for `logon`.
    async fn open_world(
        &self,
        config: &SessionConfig,
        endpoint: &RealmEndpoint,
        key: &SessionKey,
    ) -> Result<Self::World, WorldError>;
}

/// A live world server session.
#[async_trait]
pub trait WorldSession: Send + 'static {
    /// Wait for the account's character roster; returns the character names.
    async fn wait_characters(&mut self, timeout: Duration) -> Result<Vec<String>, WorldError>;

    /// Enter the world with the named character.
    async fn login(&mut self, character: &str) -> Result<(), WorldError>;

    async fn join_channel(&mut self, channel: &str) -> Result<(), WorldError>;

    fn subscribe(&mut self, kind: ChatKind, handler: ChatHandler);

    async fn send_channel_message(&mut self, text: &str, channel: &str)
        -> Result<(), WorldError>;

    /// Ask the session to terminate. Never blocks.
    fn disconnect(&mut self);

    /// Non-blocking check for a fault recorded since the session started.
    fn poll_error(&mut self) -> Option<WorldError>;
}

/// Publishes game chat into the IRC channel.
pub trait ChatPublisher: Send + Sync {
    fn publish(&self, user: &str, text: &str);
}
