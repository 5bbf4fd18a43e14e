//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
///
/// The game version is checked separately by `GameVersion::parse`, since an
/// unsupported version is fatal rather than a fixable typo.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate IRC config
    if config.irc.server.is_empty() {
        errors.push("irc.server is required".to_string());
    }
    if config.irc.port == 0 {
        errors.push("irc.port must be non-zero".to_string());
    }
    if config.irc.nickname.is_empty() {
        errors.push("irc.nickname is required".to_string());
    }
    if !config.irc.channel.starts_with('#') && !config.irc.channel.starts_with('&') {
        errors.push(format!(
            "irc.channel '{}' must start with '#' or '&'",
            config.irc.channel
        ));
    }
    if config.irc.command_prefix.is_empty() {
        errors.push("irc.command_prefix must not be empty".to_string());
    }

    // Validate game config
    if config.game.account.username.is_empty() {
        errors.push("game.account.username is required".to_string());
    }
    if config.game.account.password.is_empty() {
        errors.push("game.account.password is required".to_string());
    }
    if config.game.character.len() < 2 || config.game.character.len() > 12 {
        errors.push(format!(
            "game.character must be 2-12 characters (got {})",
            config.game.character.len()
        ));
    }
    if config.game.channel.is_empty() {
        errors.push("game.channel is required".to_string());
    }

    // Validate realm config
    if config.game.realm.host.is_empty() {
        errors.push("game.realm.host is required".to_string());
    }
    if config.game.realm.name.is_empty() {
        errors.push("game.realm.name is required".to_string());
    }
    if config.game.realm.port == 0 {
        errors.push("game.realm.port must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_valid_config() -> Config {
        Config {
            irc: IrcConfig {
                server: "irc.example.org".to_string(),
                port: 6667,
                nickname: "relaybot".to_string(),
                channel: "#world".to_string(),
                autorejoin: true,
                command_prefix: "!".to_string(),
                owners: vec!["alice".to_string()],
            },
            game: GameConfig {
                version: "ascension".to_string(),
                realm: RealmConfig {
                    host: "localhost".to_string(),
                    port: 3724,
                    name: "Lordaeron".to_string(),
                },
                account: AccountConfig {
                    username: "testuser".to_string(),
                    password: "testpass".to_string(),
                },
                character: "TestChar".to_string(),
                channel: "World".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_channel_without_sigil_fails() {
        let mut config = make_valid_config();
        config.irc.channel = "world".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("irc.channel"));
    }

    #[test]
    fn test_short_character_name_fails() {
        let mut config = make_valid_config();
        config.game.character = "A".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("2-12 characters"));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let mut config = make_valid_config();
        config.game.account.password = String::new();
        config.game.realm.port = 0;

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("game.account.password"));
        assert!(message.contains("game.realm.port"));
    }
}
