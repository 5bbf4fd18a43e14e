//! Game client versions the protocol layer can speak.
//!
//! Only the Ascension flavour of 3.3.5a is supported: its realm logon is the
//! x25519/ChaCha20 exchange in `protocol::realm`, and its world server leaves
//! packet headers unencrypted. Stock 3.3.5a servers (SRP6 logon, ARC4 header
//! crypt) are rejected at startup.

use std::fmt;

use crate::common::error::ConfigError;

/// A supported client version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameVersion {
    pub name: &'static str,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: u16,
}

impl GameVersion {
    /// Ascension's Wrath of the Lich King client, 3.3.5a build 12340.
    pub const ASCENSION: GameVersion = GameVersion {
        name: "ascension",
        major: 3,
        minor: 3,
        patch: 5,
        build: 12340,
    };

    const SUPPORTED: &'static [(&'static str, GameVersion)] = &[
        ("ascension", Self::ASCENSION),
        ("3.3.5a-ascension", Self::ASCENSION),
    ];

    /// Parse a configured version string.
    pub fn parse(version: &str) -> Result<Self, ConfigError> {
        let wanted = version.trim();
        Self::SUPPORTED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, v)| *v)
            .ok_or_else(|| ConfigError::UnsupportedVersion {
                version: version.to_string(),
                supported: Self::SUPPORTED
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}.{} ({})",
            self.name, self.major, self.minor, self.patch, self.build
        )
    }
}
