//! Tokio codec for length-prefixed frames
//!
//! Frames carry opaque bodies: encryption happens above this layer, so the
//! codec neither knows nor cares whether a body is plaintext or ciphertext.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::frame::{self, DEFAULT_MAX_BODY_LEN, HEADER_LEN};

/// Codec for encoding/decoding frames
///
/// Decoding tolerates arbitrary partial delivery from the underlying
/// stream: it returns `None` until a full header, and then a full body,
/// has been buffered.
#[derive(Debug)]
pub struct FrameCodec {
    /// Body length parsed from a header whose body has not yet arrived
    pending_len: Option<usize>,
    /// Largest declared body length this codec will buffer
    max_body_len: usize,
}

impl FrameCodec {
    /// Create a codec with the default body limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_BODY_LEN)
    }

    /// Create a codec with an explicit body limit
    pub fn with_limit(max_body_len: usize) -> Self {
        Self {
            pending_len: None,
            max_body_len,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Parse the header if we don't have one pending
        let body_len = match self.pending_len.take() {
            Some(len) => len,
            None => {
                if src.len() < HEADER_LEN {
                    return Ok(None); // Need more data
                }
                let len = frame::parse_header(&src[..HEADER_LEN])?;
                src.advance(HEADER_LEN);

                if len > self.max_body_len {
                    tracing::warn!(
                        "Rejecting frame: declared body of {} bytes exceeds limit of {}",
                        len,
                        self.max_body_len
                    );
                    return Err(ProtocolError::BodyTooLarge {
                        size: len,
                        max: self.max_body_len,
                    });
                }
                len
            }
        };

        // Wait for the full body
        if src.len() < body_len {
            src.reserve(body_len - src.len());
            self.pending_len = Some(body_len);
            return Ok(None);
        }

        Ok(Some(src.split_to(body_len).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(body) => Ok(Some(body)),
            None => {
                // EOF in the middle of a frame is an abnormal closure
                if src.is_empty() && self.pending_len.is_none() {
                    Ok(None)
                } else {
                    Err(ProtocolError::ConnectionClosed)
                }
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header = frame::encode_header(body.len())?;

        dst.reserve(HEADER_LEN + body.len());
        dst.extend_from_slice(&header);
        dst.extend_from_slice(&body);

        Ok(())
    }
}
