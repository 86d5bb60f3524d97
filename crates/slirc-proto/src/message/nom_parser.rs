//! Nom-based line splitter.
//!
//! Splits one raw line into borrowed pieces; [`Message`](super::Message)
//! turns those into owned values.

use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::MessageParseError;

/// RFC 2812 caps a message at 15 parameters.
pub(crate) const MAX_PARAMS: usize = 15;

/// Borrowed view of a line, before any allocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

/// IRCv3 tags are accepted on input and thrown away.
fn tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_till(|c| c == ' '))(input)
}

fn source(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

/// `[@tags] [:prefix] command`, with optional spaces between the parts.
fn head(input: &str) -> IResult<&str, (Option<&str>, &str)> {
    let (input, _) = opt(tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(source)(input)?;
    let (input, _) = space0(input)?;
    let (input, cmd) = command(input)?;
    Ok((input, (prefix, cmd)))
}

/// `command = 1*letter / 3digit`
fn is_valid_command(cmd: &str) -> bool {
    cmd.chars().all(|c| c.is_ascii_alphabetic())
        || (cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit()))
}

/// Middle parameters are space separated (runs of spaces collapse); a
/// parameter starting with `:` swallows the rest of the line.
fn params(mut rest: &str) -> SmallVec<[&str; MAX_PARAMS]> {
    let mut out = SmallVec::new();

    while out.len() < MAX_PARAMS {
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.len() == rest.len() || trimmed.is_empty() {
            // Parameters must be introduced by at least one space.
            break;
        }
        rest = trimmed;

        if let Some(trailing) = rest.strip_prefix(':') {
            out.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        out.push(&rest[..end]);
        rest = &rest[end..];
    }

    out
}

impl<'a> RawLine<'a> {
    /// Split a line. A trailing CR/LF is ignored.
    pub(crate) fn split(line: &'a str) -> Result<Self, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let invalid = || MessageParseError::InvalidCommand {
            line: line.to_owned(),
        };

        let (rest, (prefix, cmd)) = head(line).map_err(|_| invalid())?;
        if !is_valid_command(cmd) {
            return Err(invalid());
        }
        // "PRIVMSG#chan" is not a command followed by a parameter.
        if !rest.is_empty() && !rest.starts_with(' ') {
            return Err(invalid());
        }

        Ok(RawLine {
            prefix,
            command: cmd,
            params: params(rest),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_command() {
        let raw = RawLine::split("PING").unwrap();
        assert_eq!(raw.command, "PING");
        assert!(raw.prefix.is_none());
        assert!(raw.params.is_empty());
    }

    #[test]
    fn prefix_params_and_trailing() {
        let raw = RawLine::split(":nick!user@host PRIVMSG #channel :Hello, world!\r\n").unwrap();
        assert_eq!(raw.prefix, Some("nick!user@host"));
        assert_eq!(raw.command, "PRIVMSG");
        assert_eq!(raw.params.as_slice(), &["#channel", "Hello, world!"]);
    }

    #[test]
    fn tags_are_skipped() {
        let raw = RawLine::split("@time=2023-01-01T00:00:00Z :nick JOIN #ch").unwrap();
        assert_eq!(raw.prefix, Some("nick"));
        assert_eq!(raw.params.as_slice(), &["#ch"]);
    }

    #[test]
    fn empty_and_space_only_trailing() {
        let raw = RawLine::split("MODE #chan +k :").unwrap();
        assert_eq!(raw.params.as_slice(), &["#chan", "+k", ""]);
        let raw = RawLine::split("MODE #chan +k : ").unwrap();
        assert_eq!(raw.params.as_slice(), &["#chan", "+k", " "]);
    }

    #[test]
    fn repeated_spaces_collapse() {
        let raw = RawLine::split(":srv 353 me =  #chan  :@a +b c").unwrap();
        assert_eq!(raw.params.as_slice(), &["me", "=", "#chan", "@a +b c"]);
    }

    #[test]
    fn command_validation() {
        assert!(RawLine::split("001 me :hi").is_ok());
        assert!(RawLine::split("PING123").is_err());
        assert!(RawLine::split("12").is_err());
        assert!(RawLine::split("1234").is_err());
        assert!(RawLine::split(":prefix.only").is_err());
        assert_eq!(RawLine::split("  \r\n"), Err(MessageParseError::EmptyMessage));
    }

    #[test]
    fn parameter_cap() {
        let raw = RawLine::split("CMD p1 p2 p3 p4 p5 p6 p7 p8 p9 p10 p11 p12 p13 p14 p15 p16").unwrap();
        assert_eq!(raw.params.len(), MAX_PARAMS);
        assert_eq!(raw.params[14], "p15");
    }
}
