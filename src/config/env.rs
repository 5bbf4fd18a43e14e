//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `CHATBRIDGE_IRC_SERVER` - IRC server host
//! - `CHATBRIDGE_IRC_NICKNAME` - IRC nickname
//! - `CHATBRIDGE_GAME_USERNAME` - Game account username
//! - `CHATBRIDGE_GAME_PASSWORD` - Game account password
//! - `CHATBRIDGE_GAME_CHARACTER` - Character name
//! - `CHATBRIDGE_REALM_HOST` - Realm server host
//! - `CHATBRIDGE_REALM_PORT` - Realm server port
//! - `CHATBRIDGE_REALM_NAME` - Realm name to connect to

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "CHATBRIDGE";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like passwords to be provided via
/// environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(server) = env::var(format!("{}_IRC_SERVER", ENV_PREFIX)) {
        config.irc.server = server;
    }
    if let Ok(nickname) = env::var(format!("{}_IRC_NICKNAME", ENV_PREFIX)) {
        config.irc.nickname = nickname;
    }

    // Game credentials
    if let Ok(username) = env::var(format!("{}_GAME_USERNAME", ENV_PREFIX)) {
        config.game.account.username = username;
    }
    if let Ok(password) = env::var(format!("{}_GAME_PASSWORD", ENV_PREFIX)) {
        config.game.account.password = password;
    }
    if let Ok(character) = env::var(format!("{}_GAME_CHARACTER", ENV_PREFIX)) {
        config.game.character = character;
    }

    // Realm settings
    if let Ok(host) = env::var(format!("{}_REALM_HOST", ENV_PREFIX)) {
        config.game.realm.host = host;
    }
    if let Ok(port) = env::var(format!("{}_REALM_PORT", ENV_PREFIX)) {
        if let Ok(port) = port.parse() {
            config.game.realm.port = port;
        }
    }
    if let Ok(name) = env::var(format!("{}_REALM_NAME", ENV_PREFIX)) {
        config.game.realm.name = name;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `CHATBRIDGE_CONFIG`, otherwise returns "chatbridge.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "chatbridge.conf".to_string())
}
