//! Line codec for the ServerQuery text interface.
//!
//! The server terminates lines with `\n\r`. We split on `\n` and strip any
//! carriage returns around the line, which handles both orderings.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::QueryError;

/// Default upper bound for a single line.
///
/// `clientlist -ip` answers on one line, roughly 120 bytes per client. A full server
/// with 1024 slots stays around 128 KiB, so this leaves plenty of room.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

pub struct QueryCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl QueryCodec {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self { next_index: 0, max_len }
    }
}

impl Default for QueryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for QueryCodec {
    type Item = String;
    type Error = QueryError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, QueryError> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();

                if src.len() > self.max_len {
                    return Err(QueryError::LineTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }

                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(QueryError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = std::str::from_utf8(&line)
                .map_err(|e| QueryError::Protocol(format!("invalid UTF-8 in response: {e}")))?
                .trim_matches(['\r', '\n']);

            // `\n\r` leaves a lone `\r` in front of the next line, which trims down to nothing.
            if text.is_empty() {
                continue;
            }

            return Ok(Some(text.to_string()));
        }
    }
}

impl Encoder<String> for QueryCodec {
    type Error = QueryError;

    fn encode(&mut self, command: String, dst: &mut BytesMut) -> Result<(), QueryError> {
        if command.contains(['\n', '\r']) {
            return Err(QueryError::Protocol("command must be a single line".to_string()));
        }

        dst.reserve(command.len() + 1);
        dst.put_slice(command.as_bytes());
        dst.put_u8(b'\n');

        Ok(())
    }
}
