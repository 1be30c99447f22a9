//! Channel error types

use sw_protocol::{Command, ProtocolError};
use thiserror::Error;

use crate::handshake::HandshakeFailure;

/// Top-level error type for channel operations
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Framing or serialization error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Encryption error
    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    /// A control message arrived where a different one was expected
    #[error("Unexpected {0} message")]
    UnexpectedMessage(Command),

    /// A message is missing a required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A file transfer carried an unusable name
    #[error("Invalid file name in transfer: {0:?}")]
    InvalidFileName(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from key management and encrypt/decrypt operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Symmetric decrypt/encrypt requested before a key was installed
    #[error("Symmetric key is not set")]
    SymmetricKeyMissing,

    /// Asymmetric operation requested before the peer key was installed
    #[error("Peer public key is not set")]
    PeerKeyMissing,

    /// Peer supplied an empty public key
    #[error("Peer public key is empty")]
    EmptyPeerKey,

    /// Peer supplied a public key of the wrong length
    #[error("Peer public key has invalid length: {0} bytes")]
    InvalidPeerKey(usize),

    /// Symmetric key of the wrong length
    #[error("Symmetric key has invalid length: {0} bytes")]
    InvalidSymmetricKey(usize),

    /// Key material is installed exactly once per connection
    #[error("Key material already installed")]
    KeyAlreadySet,

    /// Asymmetric mode carries only short bootstrap secrets
    #[error("Payload too large for asymmetric mode: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Ciphertext shorter than its fixed envelope
    #[error("Ciphertext too short")]
    CiphertextTooShort,

    /// AEAD authentication failed
    #[error("Authentication failed on decrypt")]
    AuthenticationFailed,

    /// HKDF expansion failed
    #[error("Key derivation failed")]
    KeyDerivation,
}

/// Terminal handshake failure, returned to the caller of the
/// initialize functions
///
/// Recoverable in the sense that the caller may retry the whole
/// handshake over a fresh stream, or abort; it is never retried
/// internally.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Unexpected control message or stream failure
    #[error("Handshake connection failure: {0}")]
    Connection(String),

    /// Missing or unusable key material, or a decrypt failure
    #[error("Handshake encryption failure: {0}")]
    Encryption(String),
}

impl HandshakeError {
    /// The failure category this error belongs to
    pub fn failure(&self) -> HandshakeFailure {
        match self {
            HandshakeError::Connection(_) => HandshakeFailure::Connection,
            HandshakeError::Encryption(_) => HandshakeFailure::Encryption,
        }
    }

    /// The wire-level failure token (`CONN_ERROR` / `ENCRYPTION_ERROR`)
    pub fn token(&self) -> &'static str {
        self.failure().token()
    }

    pub(crate) fn from_channel(err: ChannelError) -> Self {
        match err {
            ChannelError::Crypto(e) => HandshakeError::Encryption(e.to_string()),
            other => HandshakeError::Connection(other.to_string()),
        }
    }
}
