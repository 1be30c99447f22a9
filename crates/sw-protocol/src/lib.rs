//! sw-protocol: Wire framing and message schema for SealWire channels
//!
//! This crate defines the frame format and the closed message schema used
//! for communication between two channel terminals over a duplex
//! byte-stream. Encryption is layered above: the codec here moves opaque
//! bodies, and `sw-channel` decides what those bodies contain.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::FrameCodec;
pub use error::ProtocolError;
pub use frame::{DEFAULT_MAX_BODY_LEN, HEADER_LEN};
pub use message::{Command, Message, Value};
