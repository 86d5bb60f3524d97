//! IRC message prefix (message source).
//!
//! A prefix identifies where a line came from: either a server name or a
//! user's `nick!ident@host` mask. Servers are free to send a bare nick, so the
//! ident and host parts are optional.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;

/// IRC message prefix - identifies the origin of a message.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g., "irc.example.com")
    ServerName(String),
    /// User prefix: (nickname, ident, hostname). Missing parts are empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Split a raw prefix (without the leading `:`) into its parts.
    ///
    /// Lenient: only the shape is inspected. A token without `!`/`@` that
    /// contains a dot is taken to be a server name.
    pub fn parse(s: &str) -> Self {
        let (nick_user, host) = match s.split_once('@') {
            Some((before, host)) => (before, Some(host)),
            None => (s, None),
        };
        let (nick, user) = match nick_user.split_once('!') {
            Some((nick, user)) => (nick, Some(user)),
            None => (nick_user, None),
        };

        if user.is_none() && host.is_none() && nick.contains('.') {
            return Prefix::ServerName(nick.to_owned());
        }

        Prefix::Nickname(
            nick.to_owned(),
            user.unwrap_or_default().to_owned(),
            host.unwrap_or_default().to_owned(),
        )
    }

    /// Parse with validation: rejects empty prefixes and embedded whitespace
    /// or control characters.
    pub fn try_parse(s: &str) -> Result<Self, MessageParseError> {
        if s.is_empty() || s.chars().any(|c| c == ' ' || c.is_control()) {
            return Err(MessageParseError::InvalidPrefix(s.to_owned()));
        }
        let prefix = Self::parse(s);
        if let Prefix::Nickname(nick, _, _) = &prefix {
            if nick.is_empty() {
                return Err(MessageParseError::InvalidPrefix(s.to_owned()));
            }
        }
        Ok(prefix)
    }

    /// Create a new user prefix from nick, ident, and host components.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// Get the nickname if this is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Get the ident if one was sent.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Get the hostname (the server name for server prefixes).
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl FromStr for Prefix {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_user_mask() {
        let prefix = Prefix::parse("nick!ident@host.example.com");
        assert_eq!(prefix.nick(), Some("nick"));
        assert_eq!(prefix.user(), Some("ident"));
        assert_eq!(prefix.host(), Some("host.example.com"));
    }

    #[test]
    fn bare_nick_and_server_name() {
        assert_eq!(Prefix::parse("alice"), Prefix::new("alice", "", ""));
        assert_eq!(
            Prefix::parse("irc.example.net"),
            Prefix::ServerName("irc.example.net".into())
        );
        assert_eq!(Prefix::parse("irc.example.net").nick(), None);
    }

    #[test]
    fn nick_at_host_without_ident() {
        let prefix = Prefix::parse("bob@10.0.0.1");
        assert_eq!(prefix.nick(), Some("bob"));
        assert_eq!(prefix.user(), None);
        assert_eq!(prefix.host(), Some("10.0.0.1"));
    }

    #[test]
    fn try_parse_rejects_garbage() {
        assert!(Prefix::try_parse("").is_err());
        assert!(Prefix::try_parse("has space").is_err());
        assert!(Prefix::try_parse("!user@host").is_err());
        assert!("nick!u@h".parse::<Prefix>().is_ok());
    }

    #[test]
    fn display_matches_input() {
        for raw in ["nick!ident@host", "nick@host", "nick", "irc.example.net"] {
            assert_eq!(Prefix::parse(raw).to_string(), raw);
        }
    }
}
