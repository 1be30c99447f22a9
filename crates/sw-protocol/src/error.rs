//! Protocol error types

use thiserror::Error;

/// Errors that can occur during framing and message encoding
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Body length does not fit in the fixed-width frame header
    #[error("Frame too large: length {0} does not fit in the header")]
    FrameTooLarge(usize),

    /// Malformed frame header
    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    /// Declared body length exceeds the read-side limit
    #[error("Frame body too large: {size} bytes exceeds maximum of {max} bytes")]
    BodyTooLarge { size: usize, max: usize },

    /// Stream ended before a full frame was delivered
    #[error("Connection closed mid-frame")]
    ConnectionClosed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
