//! # slirc-proto
//!
//! Client-side building blocks for the IRC line protocol:
//!
//! - [`Message`] parsing (nom) and serialization
//! - [`Prefix`] (`nick!ident@host` or server name)
//! - [`Response`] numerics used for registration and channel synchronization
//! - RFC 1459 case mapping and channel-name detection
//! - channel mode-string parsing
//! - formatting control codes
//! - a tokio [`LineCodec`] with a length cap on both directions
//!
//! ```rust
//! use slirc_proto::{Message, Response};
//!
//! let msg: Message = ":irc.example.net 353 bot = #rust :@alice +bob carol".parse().unwrap();
//! assert_eq!(msg.response(), Some(Response::RPL_NAMREPLY));
//! assert_eq!(msg.arg(2), Some("#rust"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chan;
pub mod error;
pub mod format;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, DEFAULT_MAX_LINE_LEN};
pub use self::message::Message;
pub use self::mode::{parse_channel_modes, ModeChange, ModeClass};
pub use self::prefix::Prefix;
pub use self::response::Response;
