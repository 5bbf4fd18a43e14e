//! Bot commands issued from the IRC channel (!restart, !reconnect).

use tracing::{debug, info};

/// Owner commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrcCommand {
    /// Stop the game worker and rebuild both endpoints.
    Restart,
    /// Re-establish the game session only.
    Reconnect,
}

/// Command parser for channel messages.
pub struct CommandHandler {
    prefix: String,
    owners: Vec<String>,
}

impl CommandHandler {
    pub fn new(prefix: &str, owners: &[String]) -> Self {
        Self {
            prefix: prefix.to_string(),
            owners: owners.to_vec(),
        }
    }

    /// Whether `text` is addressed to the bot rather than relayed.
    pub fn is_command(&self, text: &str) -> bool {
        !self.prefix.is_empty() && text.starts_with(&self.prefix)
    }

    /// Resolve a command message from `user`.
    ///
    /// The prefix is stripped once and the rest must match a command name
    /// exactly. Unknown commands and commands from non-owners yield `None`.
    pub fn parse(&self, user: &str, text: &str) -> Option<IrcCommand> {
        let body = text.strip_prefix(&self.prefix)?;

        let command = match body {
            "restart" => IrcCommand::Restart,
            "reconnect" => IrcCommand::Reconnect,
            other => {
                debug!("Ignoring unknown command {:?} from {}", other, user);
                return None;
            }
        };

        if !self.owners.iter().any(|owner| owner == user) {
            info!("{:?} command from {} ignored: not an owner", command, user);
            return None;
        }

        info!("{:?} command from {}", command, user);
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> CommandHandler {
        CommandHandler::new("!", &["alice".to_string()])
    }

    #[test]
    fn test_owner_commands() {
        let handler = handler();
        assert_eq!(handler.parse("alice", "!restart"), Some(IrcCommand::Restart));
        assert_eq!(handler.parse("alice", "!reconnect"), Some(IrcCommand::Reconnect));
    }

    #[test]
    fn test_non_owner_and_unknown_ignored() {
        let handler = handler();
        assert_eq!(handler.parse("mallory", "!restart"), None);
        assert_eq!(handler.parse("alice", "!dance"), None);
        // Prefix is stripped once only
        assert_eq!(handler.parse("alice", "!!restart"), None);
    }

    #[test]
    fn test_command_must_match_exactly() {
        let handler = handler();
        assert_eq!(handler.parse("alice", "!restart "), None);
        assert_eq!(handler.parse("alice", "! reconnect"), None);
        assert_eq!(handler.parse("alice", "!Restart"), None);
    }

    #[test]
    fn test_is_command() {
        let handler = handler();
        assert!(handler.is_command("!who"));
        assert!(!handler.is_command("hello !restart"));
        assert!(!CommandHandler::new("", &[]).is_command("restart"));
    }
}
