//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
#[cfg(test)]
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        irc {
            server = "irc.example.org"
            port = 6667
            nickname = "relaybot"
            channel = "#world"
            autorejoin = true
            owners = ["alice", "bob"]
        }
        game {
            version = "ascension"
            realm { host = "127.0.0.1", port = 3724, name = "Lordaeron" }
            account { username = "bridge", password = "secret" }
            character = "Relayer"
            channel = "World"
        }
    "##;

    #[test]
    fn test_load_config_str() {
        let config = load_config_str(SAMPLE).unwrap();
        assert_eq!(config.irc.server, "irc.example.org");
        assert_eq!(config.irc.port, 6667);
        assert_eq!(config.irc.channel, "#world");
        assert!(config.irc.autorejoin);
        assert_eq!(config.irc.owners, vec!["alice", "bob"]);
        assert_eq!(config.game.realm.name, "Lordaeron");
        assert_eq!(config.game.realm.port, 3724);
        assert_eq!(config.game.channel, "World");
        assert_eq!(config.game.version, "ascension");
    }

    #[test]
    fn test_command_prefix_defaults_to_bang() {
        let config = load_config_str(SAMPLE).unwrap();
        assert_eq!(config.irc.command_prefix, "!");
    }

    #[test]
    fn test_missing_section_fails() {
        let result = load_config_str("irc { server = \"x\" }");
        assert!(result.is_err());
    }
}
