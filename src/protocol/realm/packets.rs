//! Realm server packet definitions.

/// Realm authentication result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Success,
    FailBanned,
    FailUnknownAccount,
    FailIncorrectPassword,
    FailAlreadyOnline,
    FailNoTime,
    FailDbBusy,
    FailVersionInvalid,
    FailVersionUpdate,
    FailInvalidServer,
    FailSuspended,
    FailNoAccess,
    FailSurveySuccess,
    FailParentControl,
    FailTrialEnded,
    Unknown(u8),
}

impl AuthResult {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Success,
            0x03 => Self::FailBanned,
            0x04 => Self::FailUnknownAccount,
            0x05 => Self::FailIncorrectPassword,
            0x06 => Self::FailAlreadyOnline,
            0x07 => Self::FailNoTime,
            0x08 => Self::FailDbBusy,
            0x09 => Self::FailVersionInvalid,
            0x0A => Self::FailVersionUpdate,
            0x0B => Self::FailInvalidServer,
            0x0C => Self::FailSuspended,
            0x0D => Self::FailNoAccess,
            0x0E => Self::FailSurveySuccess,
            0x0F => Self::FailParentControl,
            0x11 => Self::FailTrialEnded,
            other => Self::Unknown(other),
        }
    }

    /// Returns true if the authentication was successful.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::FailSurveySuccess)
    }

    /// Returns a human-readable error message for this auth result.
    pub fn message(&self) -> String {
        match self {
            Self::Success | Self::FailSurveySuccess => "Success!".to_string(),
            Self::FailBanned => "Account has been banned".to_string(),
            Self::FailIncorrectPassword | Self::FailUnknownAccount => {
                "Incorrect username or password".to_string()
            }
            Self::FailAlreadyOnline => "Account is already online".to_string(),
            Self::FailVersionInvalid | Self::FailVersionUpdate => {
                "Invalid game version for this server".to_string()
            }
            Self::FailSuspended => "Account has been suspended".to_string(),
            Self::FailNoAccess => "No access to this server".to_string(),
            Self::FailNoTime => "Account has no game time".to_string(),
            Self::FailDbBusy => "Database is busy".to_string(),
            Self::FailInvalidServer => "Invalid server selected".to_string(),
            Self::FailParentControl => "Account is restricted by parental controls".to_string(),
            Self::FailTrialEnded => "Trial period has ended".to_string(),
            Self::Unknown(code) => format!("Unknown logon error code {:02X}", code),
        }
    }
}

/// One entry of the realm list.
#[derive(Debug, Clone)]
pub struct RealmInfo {
    /// Realm ID.
    pub id: u8,
    /// Realm name.
    pub name: String,
    /// Realm address (host:port).
    pub address: String,
}

impl RealmInfo {
    /// Parse the address into host and port.
    pub fn parse_address(&self) -> Option<(&str, u16)> {
        let (host, port) = self.address.rsplit_once(':')?;
        let port = port.parse().ok()?;
        Some((host, port))
    }
}
