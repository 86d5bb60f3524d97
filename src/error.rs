//! Unified error handling for slircbot.
//!
//! Each layer gets its own enum; `anyhow` is only used at the binary edge.

use slirc_proto::{MessageParseError, ProtocolError};
use thiserror::Error;

// ============================================================================
// State store errors (invariant breaches)
// ============================================================================

/// Failed state store operations.
///
/// These indicate a caller asked for something the model says cannot be
/// true. Built-in handlers check before mutating, so reaching one of these is
/// a bug rather than server drift.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("no such user: {0}")]
    NoSuchUser(String),

    #[error("{nick} is not a member of {channel}")]
    NoSuchMembership { channel: String, nick: String },

    #[error("no ban {mask} on {channel}")]
    NoSuchBan { channel: String, mask: String },

    #[error("index mismatch: {0}")]
    IndexMismatch(String),
}

impl StateError {
    /// Static code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSuchChannel(_) => "no_such_channel",
            Self::NoSuchUser(_) => "no_such_user",
            Self::NoSuchMembership { .. } => "no_such_membership",
            Self::NoSuchBan { .. } => "no_such_ban",
            Self::IndexMismatch(_) => "index_mismatch",
        }
    }
}

// ============================================================================
// Dispatch errors
// ============================================================================

/// Why a line could not be dispatched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed line: {0}")]
    Parse(#[from] MessageParseError),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

// ============================================================================
// Link errors (transport driver)
// ============================================================================

/// Errors surfaced by the connection driver.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
