//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Unsupported game version '{version}' (supported: {supported})")]
    UnsupportedVersion { version: String, supported: String },
}

/// Packet-level protocol errors (game wire format).
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unexpected opcode: expected {expected}, got {actual}")]
    UnexpectedOpcode { expected: u16, actual: u16 },

    #[error("Packet too short: need {needed} bytes, got {got}")]
    PacketTooShort { needed: usize, got: usize },

    #[error("Invalid string encoding: {message}")]
    InvalidString { message: String },

    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Encryption error: {message}")]
    EncryptionError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failure of a realm logon, grouped by the handshake phase that failed.
#[derive(Debug, Error)]
pub enum RealmError {
    #[error("logon challenge failed: {0}")]
    Challenge(#[source] ProtocolError),

    #[error("logon proof failed: {0}")]
    Proof(#[source] ProtocolError),

    #[error("realm stream broken: {0}")]
    StreamBroken(#[from] ConnectionError),

    #[error("logon crypto failed: {0}")]
    Crypto(#[source] ProtocolError),
}

impl RealmError {
    /// Short category name used in debug logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Challenge(_) => "challenge",
            Self::Proof(_) => "proof",
            Self::StreamBroken(_) => "stream",
            Self::Crypto(_) => "crypto",
        }
    }
}

/// World session failures.
///
/// Cloneable so a session can park its first fault in a watch slot that the
/// bridge worker polls without blocking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("timed out waiting for the world server")]
    Timeout,

    #[error("world stream broken: {0}")]
    StreamBroken(String),

    #[error("world authentication rejected (code 0x{0:02X})")]
    AuthRejected(u8),

    #[error("character '{0}' not found on account")]
    BadCharacter(String),

    #[error("world session closed")]
    Closed,
}

/// IRC endpoint errors.
#[derive(Debug, Error)]
pub enum IrcError {
    #[error("Failed to connect to IRC server {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IRC connection closed by server")]
    ConnectionClosed,

    #[error("IRC line error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),
}
