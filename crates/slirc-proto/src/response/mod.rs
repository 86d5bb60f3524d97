//! IRC numeric replies the client side cares about.
//!
//! Only the numerics that drive registration, liveness and channel
//! synchronization are named here; anything else stays a plain three-digit
//! command string on [`Message`](crate::Message).
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

use std::fmt;

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    // === Connection Registration ===
    /// 001 - Welcome; first argument is the nick the server settled on
    RPL_WELCOME = 1,
    /// 002 - Your host is ...
    RPL_YOURHOST = 2,
    /// 003 - This server was created ...
    RPL_CREATED = 3,
    /// 004 - Server name, version, user modes, channel modes
    RPL_MYINFO = 4,
    /// 005 - Server supported features (ISUPPORT)
    RPL_ISUPPORT = 5,

    // === WHOIS ===
    /// 311 - `<nick> <user> <host> * :<real name>`
    RPL_WHOISUSER = 311,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS = 318,

    // === Channel burst ===
    /// 315 - End of WHO
    RPL_ENDOFWHO = 315,
    /// 324 - `<channel> <modes> <mode params>`
    RPL_CHANNELMODEIS = 324,
    /// 329 - Channel creation time
    RPL_CREATIONTIME = 329,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 333 - Who set the topic and when
    RPL_TOPICWHOTIME = 333,
    /// 352 - `<channel> <user> <host> <server> <nick> <flags> :<hops> <real name>`
    RPL_WHOREPLY = 352,
    /// 353 - `<symbol> <channel> :<prefixed nicks>`
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 367 - `<channel> <mask> [<setter> <time>]`
    RPL_BANLIST = 367,
    /// 368 - End of ban list
    RPL_ENDOFBANLIST = 368,

    // === Misc ===
    /// 396 - Displayed host changed (cloak applied)
    RPL_HOSTHIDDEN = 396,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
}

impl Response {
    const ALL: [Response; 19] = [
        Response::RPL_WELCOME,
        Response::RPL_YOURHOST,
        Response::RPL_CREATED,
        Response::RPL_MYINFO,
        Response::RPL_ISUPPORT,
        Response::RPL_WHOISUSER,
        Response::RPL_ENDOFWHOIS,
        Response::RPL_ENDOFWHO,
        Response::RPL_CHANNELMODEIS,
        Response::RPL_CREATIONTIME,
        Response::RPL_TOPIC,
        Response::RPL_TOPICWHOTIME,
        Response::RPL_WHOREPLY,
        Response::RPL_NAMREPLY,
        Response::RPL_ENDOFNAMES,
        Response::RPL_BANLIST,
        Response::RPL_ENDOFBANLIST,
        Response::RPL_HOSTHIDDEN,
        Response::ERR_NICKNAMEINUSE,
    ];

    /// Numeric value of this response.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a known numeric.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Whether this numeric is part of connection registration (001-005).
    pub fn is_registration(self) -> bool {
        (1..=5).contains(&self.code())
    }

    /// Whether this numeric belongs to a channel burst exchange.
    pub fn is_burst_reply(self) -> bool {
        matches!(
            self,
            Response::RPL_ENDOFWHO
                | Response::RPL_CHANNELMODEIS
                | Response::RPL_CREATIONTIME
                | Response::RPL_TOPIC
                | Response::RPL_TOPICWHOTIME
                | Response::RPL_WHOREPLY
                | Response::RPL_NAMREPLY
                | Response::RPL_ENDOFNAMES
                | Response::RPL_BANLIST
                | Response::RPL_ENDOFBANLIST
        )
    }
}

/// Formats as the zero-padded wire token, e.g. `001`.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
