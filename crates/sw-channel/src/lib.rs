//! sw-channel: Encrypted channel terminal and handshake for SealWire
//!
//! This crate turns a raw duplex byte-stream into an encrypted,
//! bidirectional message channel between an initiator and a responder.
//! Confidentiality is bootstrapped with an asymmetric key exchange and
//! switches to symmetric authenticated encryption for steady-state
//! traffic.
//!
//! ```no_run
//! use sw_channel::{ChannelTerminal, Message, Command};
//!
//! # async fn run(stream: tokio::io::DuplexStream) -> anyhow::Result<()> {
//! let mut terminal = ChannelTerminal::new(stream);
//! terminal.initialize_as_initiator().await?;
//!
//! terminal.send_message(&Message::new(Command::Ping)).await?;
//! let reply = terminal.recv_message().await?;
//! assert_eq!(reply.command(), Command::Pong);
//!
//! terminal.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod handshake;
pub mod terminal;

pub use config::ChannelConfig;
pub use crypto::{EncryptionMode, KeyManager};
pub use error::{ChannelError, CryptoError, HandshakeError};
pub use handshake::{HandshakeFailure, HandshakeState};
pub use terminal::ChannelTerminal;

// Re-export the wire types applications handle directly
pub use sw_protocol::{Command, Message, Value};
