//! Canonical message types for bridge communication.
//!
//! This module defines the types that cross task boundaries between the IRC
//! endpoint, the bridge worker and the world session.

/// A chat packet decoded by the world session, with its sender resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Opcode of the packet that carried the message.
    pub opcode: u16,
    /// WoW chat type (see `protocol::game::chat::chat_events`).
    pub chat_type: u8,
    /// Channel name for custom channel messages.
    pub channel: Option<String>,
    /// Sender's character name.
    pub sender: String,
    /// Message text.
    pub text: String,
}

/// Message from IRC to be relayed into the game channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// IRC nickname of the author.
    pub sender: String,
    /// Message text, unbounded in length.
    pub text: String,
}

/// Requests the IRC endpoint hands to the bridge worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    /// Relay a channel message into the game.
    Relay(OutboundMessage),
    /// Tear down and re-establish the game session.
    Reconnect,
}

/// How a bridge instance ended; consumed by the supervisor loop in `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// An owner asked for both endpoints to be rebuilt.
    Restart,
    /// The process is shutting down.
    Shutdown,
}
