//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub irc: IrcConfig,
    pub game: GameConfig,
}

/// IRC side of the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub server: String,
    pub port: u16,
    pub nickname: String,
    pub channel: String,
    /// Rejoin the channel after being kicked.
    #[serde(default)]
    pub autorejoin: bool,
    /// Prefix marking a channel message as a bot command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Nicknames allowed to run owner commands.
    #[serde(default)]
    pub owners: Vec<String>,
}

/// Game server connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Client flavour to speak, e.g. "ascension" (3.3.5a build 12340, Ascension logon).
    pub version: String,
    pub realm: RealmConfig,
    pub account: AccountConfig,
    pub character: String,
    /// In-game custom channel relayed to IRC.
    pub channel: String,
}

/// Realm server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealmConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
}

/// Account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

fn default_command_prefix() -> String {
    "!".to_string()
}
