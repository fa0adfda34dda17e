//! Line-based codec for tokio.
//!
//! Frames a byte stream on `\n`, strips the line ending and decodes the
//! bytes as UTF-8, replacing invalid sequences. A frame longer than the
//! configured guard is cut at the guard and flagged; the rest of it is
//! discarded up to the next `\n` so a peer cannot make us buffer without
//! bound.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error;
use crate::message::{MAX_LINE_LEN, MAX_TAGS_LEN};

/// Default framing guard: a full tag section plus a full message.
pub const MAX_FRAME_LEN: usize = MAX_TAGS_LEN + MAX_LINE_LEN;

/// One framed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Line text without its line ending.
    pub text: String,
    /// The frame overran the guard and everything past it was dropped.
    pub truncated: bool,
}

impl Line {
    fn from_bytes(bytes: &[u8], truncated: bool) -> Self {
        let text = String::from_utf8_lossy(bytes);
        Self {
            text: text.trim_end_matches(['\r', '\n']).to_owned(),
            truncated,
        }
    }
}

/// Newline-delimited codec.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Skipping the tail of an overrun frame.
    discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default [`MAX_FRAME_LEN`] guard.
    pub fn new() -> Self {
        Self::with_max_len(MAX_FRAME_LEN)
    }

    /// Create a codec with a custom framing guard.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Line;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Line>> {
        if self.discarding {
            match src.iter().position(|b| *b == b'\n') {
                Some(offset) => {
                    src.advance(offset + 1);
                    self.discarding = false;
                }
                None => {
                    src.clear();
                    return Ok(None);
                }
            }
        }

        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Ok(Some(Line::from_bytes(&line[..self.max_len], true)));
            }
            Ok(Some(Line::from_bytes(&line, false)))
        } else if src.len() > self.max_len {
            let head = src.split_to(self.max_len);
            src.clear();
            self.next_index = 0;
            self.discarding = true;
            Ok(Some(Line::from_bytes(&head, true)))
        } else {
            self.next_index = src.len();
            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}
