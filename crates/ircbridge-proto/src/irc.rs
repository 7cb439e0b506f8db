//! IRC message codec for tokio.
//!
//! Frames a byte stream into CRLF (or bare LF) terminated lines and parses
//! each line into a [`Message`]. Unparseable lines are logged and skipped
//! instead of failing the stream: `Framed` stops yielding after the first
//! decoder error, and one bad line from a server must not end a session.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::message::Message;
use crate::DEFAULT_MAX_LINE_LEN;

/// Tokio codec for encoding/decoding IRC messages.
#[derive(Debug)]
pub struct IrcCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length in bytes, terminator included
    max_len: usize,
}

impl IrcCodec {
    /// Create a codec with the standard 512-byte line limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Sanitize outgoing message data.
    ///
    /// Truncates at the first line ending so a payload can never smuggle a
    /// second command onto the wire.
    pub fn sanitize(mut data: String) -> String {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }
        data
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                if src.len() > self.max_len {
                    return Err(ProtocolError::MessageTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() {
                continue;
            }

            match text.parse::<Message>() {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    tracing::warn!(line = %text, error = %e, "Skipping unparseable IRC line");
                }
            }
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(msg.to_string());
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
