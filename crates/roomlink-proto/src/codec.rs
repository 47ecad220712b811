//! Newline-delimited JSON codec for tokio.
//!
//! Each frame is one JSON document followed by `\n`. Lines are limited to
//! [`DEFAULT_MAX_LEN`] bytes unless configured otherwise.

use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Default maximum line length in bytes, including the terminator.
pub const DEFAULT_MAX_LEN: usize = 64 * 1024;

/// Codec decoding `T` from JSON lines and encoding any serializable value.
pub struct JsonLinesCodec<T> {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonLinesCodec<T> {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            _item: PhantomData,
        }
    }

    /// Configured line limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl<T> Default for JsonLinesCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Decoder for JsonLinesCodec<T> {
    type Item = T;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<T>> {
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

            let text = std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidUtf8 {
                byte_pos: e.valid_up_to(),
            })?;
            let text = text.trim_end_matches(&['\r', '\n'][..]);

            // keepalive blank lines
            if text.trim().is_empty() {
                continue;
            }

            return Ok(Some(serde_json::from_str(text)?));
        }
    }
}

impl<T, U: Serialize> Encoder<U> for JsonLinesCodec<T> {
    type Error = ProtocolError;

    fn encode(&mut self, item: U, dst: &mut BytesMut) -> error::Result<()> {
        let body = serde_json::to_vec(&item)?;
        if body.len() + 1 > self.max_len {
            return Err(ProtocolError::MessageTooLong {
                actual: body.len() + 1,
                limit: self.max_len,
            });
        }
        dst.reserve(body.len() + 1);
        dst.put_slice(&body);
        dst.put_u8(b'\n');
        Ok(())
    }
}
