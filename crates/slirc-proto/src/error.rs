//! Error types for the IRC protocol library.
//!
//! [`ProtocolError`] covers transport-level failures of the line codec,
//! [`MessageParseError`] covers lines that arrived intact but could not be
//! turned into a [`Message`](crate::Message).

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded the maximum allowed length (CRLF included).
    #[error("line too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Outbound line carried an embedded line break.
    #[error("line contains an embedded CR or LF")]
    EmbeddedNewline,
}

impl ProtocolError {
    /// Whether the connection can keep going after this error.
    ///
    /// A line rejected by the codec is dropped on its own; anything from the
    /// socket itself ends the link.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Errors produced while parsing a single line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty (or only whitespace).
    #[error("empty message")]
    EmptyMessage,

    /// No command token could be found, or it is not `1*letter / 3digit`.
    #[error("invalid or missing command in {line:?}")]
    InvalidCommand {
        /// The offending line, for logging.
        line: String,
    },

    /// A prefix was present but malformed.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_fatal() {
        let err = ProtocolError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!err.is_recoverable());
        assert!(ProtocolError::MessageTooLong { actual: 600, limit: 512 }.is_recoverable());
        assert!(ProtocolError::EmbeddedNewline.is_recoverable());
    }

    #[test]
    fn display_includes_limits() {
        let err = ProtocolError::MessageTooLong { actual: 600, limit: 512 };
        assert_eq!(err.to_string(), "line too long: 600 bytes (limit: 512)");
    }
}
