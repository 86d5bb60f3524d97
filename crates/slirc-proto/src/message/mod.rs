//! IRC message type and parsing.
//!
//! A [`Message`] is an owned, generic view of one line: optional source,
//! an upper-cased command token and its arguments. The agent does not need a
//! typed command enum; handlers look commands up by name.

mod nom_parser;

use std::fmt;
use std::str::FromStr;

use crate::error::MessageParseError;
use crate::prefix::Prefix;
use crate::response::Response;

use self::nom_parser::RawLine;

/// An owned IRC message.
///
/// ```
/// use slirc_proto::Message;
///
/// let msg: Message = ":nick!user@host KICK #chan victim :bye".parse().unwrap();
/// assert_eq!(msg.command, "KICK");
/// assert_eq!(msg.source_nick(), Some("nick"));
/// assert_eq!(msg.arg(2), Some("bye"));
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message source, if the line carried one.
    pub prefix: Option<Prefix>,
    /// Command name or three-digit numeric, upper-cased.
    pub command: String,
    /// Arguments, the trailing one included.
    pub args: Vec<String>,
}

impl Message {
    /// Build an outbound message without a source.
    pub fn new<I, S>(command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.to_ascii_uppercase(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a source prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Nick of the sender, when the source is a user.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// The numeric reply this message carries, if its command is a known numeric.
    pub fn response(&self) -> Option<Response> {
        self.command.parse::<u16>().ok().and_then(Response::from_code)
    }

    /// Whether the command token is a three-digit numeric.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = RawLine::split(s)?;
        let prefix = raw.prefix.map(Prefix::try_parse).transpose()?;
        Ok(Message {
            prefix,
            command: raw.command.to_ascii_uppercase(),
            args: raw.params.iter().map(|p| (*p).to_owned()).collect(),
        })
    }
}

/// Serializes without the CRLF terminator; the line codec adds it.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;

        let Some((last, middle)) = self.args.split_last() else {
            return Ok(());
        };
        for arg in middle {
            write!(f, " {}", arg)?;
        }
        if last.is_empty() || last.contains(' ') || last.starts_with(':') {
            write!(f, " :{}", last)
        } else {
            write!(f, " {}", last)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_command_and_args() {
        let msg: Message = ":alice!a@host.example PRIVMSG #rust :hello there".parse().unwrap();
        assert_eq!(msg.source_nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.args, vec!["#rust", "hello there"]);
    }

    #[test]
    fn lowercase_commands_are_normalized() {
        let msg: Message = "ping :token".parse().unwrap();
        assert_eq!(msg.command, "PING");
    }

    #[test]
    fn numerics_resolve_to_responses() {
        let msg: Message = ":irc.example.net 366 me #chan :End of /NAMES list.".parse().unwrap();
        assert!(msg.is_numeric());
        assert_eq!(msg.response(), Some(Response::RPL_ENDOFNAMES));
        assert_eq!(msg.prefix, Some(Prefix::ServerName("irc.example.net".into())));
    }

    #[test]
    fn missing_command_is_an_error() {
        assert!(matches!(
            ":nick!u@h".parse::<Message>(),
            Err(MessageParseError::InvalidCommand { .. })
        ));
        assert_eq!("".parse::<Message>(), Err(MessageParseError::EmptyMessage));
    }

    #[test]
    fn display_uses_trailing_only_when_needed() {
        assert_eq!(Message::new("JOIN", ["#chan"]).to_string(), "JOIN #chan");
        assert_eq!(
            Message::new("PRIVMSG", ["#chan", "two words"]).to_string(),
            "PRIVMSG #chan :two words"
        );
        assert_eq!(Message::new("TOPIC", ["#chan", ""]).to_string(), "TOPIC #chan :");
        assert_eq!(Message::new("QUIT", Vec::<String>::new()).to_string(), "QUIT");
        assert_eq!(
            Message::new("PONG", [":odd"]).with_prefix(Prefix::new("me", "", "")).to_string(),
            ":me PONG ::odd"
        );
    }
}
