//! IRC line parsing and formatting.

use std::borrow::Cow;
use std::fmt;

/// Longest line body we send; the protocol limit of 512 includes CRLF.
pub const MAX_LINE_BYTES: usize = 510;

/// Characters that would end or corrupt a line on the wire.
const LINE_BREAKERS: [char; 3] = ['\r', '\n', '\0'];

/// A tokenised IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    /// Source of the message, without the leading ':'.
    pub prefix: Option<String>,
    pub command: String,
    /// Parameters; a trailing parameter is the last element.
    pub params: Vec<String>,
}

impl IrcMessage {
    pub fn new(command: &str, params: &[&str]) -> Self {
        Self {
            prefix: None,
            command: command.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Parse one line as received from the server. Message tags are skipped.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut raw = raw.trim_end_matches(['\r', '\n']).trim_start();

        if raw.starts_with('@') {
            let space = raw.find(' ')?;
            raw = raw[space..].trim_start();
        }

        let prefix = match raw.strip_prefix(':') {
            Some(rest) => {
                let space = rest.find(' ')?;
                raw = rest[space..].trim_start();
                Some(rest[..space].to_string())
            }
            None => None,
        };

        if raw.is_empty() {
            return None;
        }

        let (command, mut rest) = match raw.find(' ') {
            Some(offset) => (&raw[..offset], &raw[offset + 1..]),
            None => (raw, ""),
        };

        let mut params = Vec::new();
        loop {
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.find(' ') {
                Some(offset) => {
                    let arg = &rest[..offset];
                    if !arg.is_empty() {
                        params.push(arg.to_string());
                    }
                    rest = &rest[offset + 1..];
                }
                None => {
                    if !rest.is_empty() {
                        params.push(rest.to_string());
                    }
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_uppercase(),
            params,
        })
    }

    /// Nickname part of a `nick!user@host` prefix.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|prefix| prefix.split('!').next().unwrap_or(prefix))
    }

    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }

    /// Format for the wire: a single line of at most [`MAX_LINE_BYTES`],
    /// cut on a character boundary. CRLF is left to the caller.
    pub fn to_line(&self) -> String {
        let mut line = self.to_string();
        if line.len() > MAX_LINE_BYTES {
            let mut end = MAX_LINE_BYTES;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            line.truncate(end);
        }
        line
    }
}

/// Replace CR, LF and NUL with spaces so a parameter cannot start a new line.
fn single_line(param: &str) -> Cow<'_, str> {
    if param.contains(LINE_BREAKERS) {
        Cow::Owned(param.replace(LINE_BREAKERS, " "))
    } else {
        Cow::Borrowed(param)
    }
}

impl fmt::Display for IrcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {}", single_line(param))?;
            }
            let last = single_line(last);
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let msg = IrcMessage::parse(":alice!al@example.org PRIVMSG #wow :hello there\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!al@example.org"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#wow", "hello there"]);
        assert_eq!(msg.source_nick(), Some("alice"));
    }

    #[test]
    fn test_parse_without_prefix_or_trailing() {
        let msg = IrcMessage::parse("PING irc.example.org").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["irc.example.org"]);

        let msg = IrcMessage::parse("ping").unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_parse_skips_tags_and_extra_spaces() {
        let msg = IrcMessage::parse("@time=2024-01-01T00:00:00Z :srv 001  bot :Welcome").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("srv"));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["bot", "Welcome"]);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(IrcMessage::parse(""), None);
        assert_eq!(IrcMessage::parse(":onlyprefix"), None);
    }

    #[test]
    fn test_format() {
        assert_eq!(
            IrcMessage::new("PRIVMSG", &["#wow", "Thrall: for the horde"]).to_string(),
            "PRIVMSG #wow :Thrall: for the horde"
        );
        assert_eq!(IrcMessage::new("JOIN", &["#wow"]).to_string(), "JOIN #wow");
        assert_eq!(
            IrcMessage::new("USER", &["bot", "0", "*", "bot"]).to_string(),
            "USER bot 0 * bot"
        );
        assert_eq!(IrcMessage::new("QUIT", &[""]).to_string(), "QUIT :");
    }

    #[test]
    fn test_line_breaks_cannot_escape_parameter() {
        let msg = IrcMessage::new("PRIVMSG", &["#wow", "hi\r\nQUIT :gone\0"]);
        let line = msg.to_line();
        assert_eq!(line, "PRIVMSG #wow :hi  QUIT :gone ");
        assert!(!line.contains(LINE_BREAKERS));

        // A middle parameter with a break becomes harmless too
        let msg = IrcMessage::new("JOIN", &["#a\nQUIT", "key"]);
        assert_eq!(msg.to_line(), "JOIN #a QUIT key");
    }

    #[test]
    fn test_to_line_caps_length_on_char_boundary() {
        let text = "é".repeat(400);
        let line = IrcMessage::new("PRIVMSG", &["#wow", &text]).to_line();
        assert!(line.len() <= MAX_LINE_BYTES);
        assert!(line.len() >= MAX_LINE_BYTES - 1);
        assert!(line.starts_with("PRIVMSG #wow :éé"));

        let short = IrcMessage::new("PING", &["srv"]).to_line();
        assert_eq!(short, "PING srv");
    }
}
