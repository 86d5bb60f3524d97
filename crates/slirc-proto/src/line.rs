//! Line-based codec for tokio.
//!
//! Frames `\r\n` (or bare `\n`) terminated lines and enforces a maximum line
//! length in both directions. An oversized inbound line is discarded whole
//! and the stream carries on with the next one; bytes that are not UTF-8 are
//! replaced. An oversized outbound line is an encoding error.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Default IRC line limit, CRLF included.
pub const DEFAULT_MAX_LINE_LEN: usize = 512;

/// Line codec with a length cap.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of the next byte to scan for a newline.
    next_index: usize,
    /// Maximum line length, terminator included.
    max_len: usize,
    /// Skipping the tail of an oversized line until its newline.
    discarding: bool,
    /// Number of inbound lines dropped for length.
    dropped: u64,
}

impl LineCodec {
    /// Codec with the standard 512-byte limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Codec with a custom limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
            dropped: 0,
        }
    }

    /// Configured limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// How many inbound lines were dropped for exceeding the limit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn note_dropped(&mut self, len: usize) {
        self.dropped += 1;
        tracing::warn!(len, limit = self.max_len, "Dropping oversized inbound line");
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    // Partial line already over the limit: drop what we have
                    // and skip ahead to its end.
                    if !self.discarding {
                        self.note_dropped(src.len());
                    }
                    self.discarding = true;
                    src.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() > self.max_len {
                self.note_dropped(line.len());
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            if let std::borrow::Cow::Owned(_) = text {
                tracing::debug!("Replaced invalid UTF-8 in inbound line");
            }
            let text = text.trim_end_matches(['\r', '\n']);
            return Ok(Some(text.to_owned()));
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        if line.contains(['\r', '\n']) {
            return Err(ProtocolError::EmbeddedNewline);
        }
        let framed_len = line.len() + 2;
        if framed_len > self.max_len {
            return Err(ProtocolError::MessageTooLong {
                actual: framed_len,
                limit: self.max_len,
            });
        }

        dst.reserve(framed_len);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
