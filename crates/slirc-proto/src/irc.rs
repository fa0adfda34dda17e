//! IRC message codec for tokio.
//!
//! Wraps [`LineCodec`]: inbound lines become [`Decoded`] messages, outbound
//! [`Message`]s go through the checked [`Message::encode`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error;
use crate::line::LineCodec;
use crate::message::{Decoded, Message};

/// Tokio codec for encoding/decoding IRC messages.
#[derive(Debug, Default)]
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a codec with the default framing guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with a custom framing guard in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }
}

impl Decoder for IrcCodec {
    type Item = Decoded;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Decoded>> {
        // Blank lines carry nothing; skip them rather than failing the stream.
        while let Some(line) = self.inner.decode(src)? {
            if line.text.trim().is_empty() {
                continue;
            }
            match Message::decode(&line.text) {
                Ok(mut decoded) => {
                    decoded.truncated |= line.truncated;
                    return Ok(Some(decoded));
                }
                // Cutting a frame at the guard can leave it unparseable
                // (a tag section with no end, say); such a frame is dropped.
                Err(_) if line.truncated => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let line = msg.encode()?;
        self.inner.encode(line, dst)
    }
}
