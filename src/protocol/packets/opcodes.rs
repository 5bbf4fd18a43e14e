//! WoW protocol opcodes for WotLK 3.3.5a.

// ============================================================================
// Realm Server Opcodes
// ============================================================================

/// Realm authentication opcodes.
pub mod realm {
    /// Client -> Server: Initial login challenge
    pub const AUTH_LOGON_CHALLENGE: u8 = 0x00;
    /// Client -> Server: Login proof
    pub const AUTH_LOGON_PROOF: u8 = 0x01;
    /// Client -> Server: Request realm list
    pub const REALM_LIST: u8 = 0x10;
}

// ============================================================================
// Game Server Opcodes
// ============================================================================

// --- Authentication ---
pub const SMSG_AUTH_CHALLENGE: u16 = 0x01EC;
pub const CMSG_AUTH_SESSION: u16 = 0x01ED;
pub const SMSG_AUTH_RESPONSE: u16 = 0x01EE;

// --- Character ---
pub const CMSG_CHAR_ENUM: u16 = 0x0037;
pub const SMSG_CHAR_ENUM: u16 = 0x003B;
pub const CMSG_PLAYER_LOGIN: u16 = 0x003D;

// --- World ---
pub const SMSG_LOGIN_VERIFY_WORLD: u16 = 0x0236;

// --- Keep-alive ---
pub const CMSG_PING: u16 = 0x01DC;
pub const SMSG_PONG: u16 = 0x01DD;
pub const CMSG_KEEP_ALIVE: u16 = 0x0407;

// --- Time ---
pub const SMSG_TIME_SYNC_REQ: u16 = 0x0390;
pub const CMSG_TIME_SYNC_RESP: u16 = 0x0391;

// --- Chat ---
pub const SMSG_MESSAGECHAT: u16 = 0x0096;
pub const CMSG_MESSAGECHAT: u16 = 0x0095;
pub const SMSG_GM_MESSAGECHAT: u16 = 0x03B3;

// --- Channels ---
pub const CMSG_JOIN_CHANNEL: u16 = 0x0097;
pub const SMSG_CHANNEL_NOTIFY: u16 = 0x0099;

// --- Name queries ---
pub const CMSG_NAME_QUERY: u16 = 0x0050;
pub const SMSG_NAME_QUERY: u16 = 0x0051;

/// Get a human-readable name for an opcode.
pub fn opcode_name(opcode: u16) -> &'static str {
    match opcode {
        SMSG_AUTH_CHALLENGE => "SMSG_AUTH_CHALLENGE",
        CMSG_AUTH_SESSION => "CMSG_AUTH_SESSION",
        SMSG_AUTH_RESPONSE => "SMSG_AUTH_RESPONSE",
        CMSG_CHAR_ENUM => "CMSG_CHAR_ENUM",
        SMSG_CHAR_ENUM => "SMSG_CHAR_ENUM",
        CMSG_PLAYER_LOGIN => "CMSG_PLAYER_LOGIN",
        SMSG_LOGIN_VERIFY_WORLD => "SMSG_LOGIN_VERIFY_WORLD",
        CMSG_PING => "CMSG_PING",
        SMSG_PONG => "SMSG_PONG",
        CMSG_KEEP_ALIVE => "CMSG_KEEP_ALIVE",
        SMSG_TIME_SYNC_REQ => "SMSG_TIME_SYNC_REQ",
        CMSG_TIME_SYNC_RESP => "CMSG_TIME_SYNC_RESP",
        SMSG_MESSAGECHAT => "SMSG_MESSAGECHAT",
        CMSG_MESSAGECHAT => "CMSG_MESSAGECHAT",
        SMSG_GM_MESSAGECHAT => "SMSG_GM_MESSAGECHAT",
        CMSG_JOIN_CHANNEL => "CMSG_JOIN_CHANNEL",
        SMSG_CHANNEL_NOTIFY => "SMSG_CHANNEL_NOTIFY",
        CMSG_NAME_QUERY => "CMSG_NAME_QUERY",
        SMSG_NAME_QUERY => "SMSG_NAME_QUERY",
        _ => "UNKNOWN",
    }
}
