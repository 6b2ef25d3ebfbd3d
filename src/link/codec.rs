//! Byte-line framing for the read loop.
//!
//! Lines come out as raw bytes without their terminator; decoding to text is
//! left to the [`Normalizer`](slirc_wire::Normalizer) so a bad byte never
//! costs us the connection.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Tag section limit plus the classic 512-byte body.
pub const MAX_INBOUND_LINE: usize = 8191 + 512;

/// Splits a byte stream on `\n`, dropping `\r\n` / `\n`.
#[derive(Debug)]
pub struct RawLineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl RawLineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_INBOUND_LINE)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn too_long(actual: usize, limit: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inbound line of {actual} bytes exceeds {limit}"),
        )
    }
}

impl Default for RawLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RawLineCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let mut line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(Self::too_long(line.len(), self.max_len));
            }

            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            Ok(Some(line))
        } else {
            self.next_index = src.len();
            if src.len() > self.max_len {
                return Err(Self::too_long(src.len(), self.max_len));
            }
            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // Unterminated tail: hand it over as the last line.
        self.next_index = 0;
        if src.is_empty() {
            Ok(None)
        } else {
            Ok(Some(src.split()))
        }
    }
}
