//! Message schema for the SealWire protocol
//!
//! Every frame body is one serialized [`Message`]: a command discriminator
//! plus a map of named fields. The schema is deliberately closed — a field
//! value can only be text, a number, bytes, or a nested map — because frame
//! bodies may originate from an unauthenticated peer before the handshake
//! completes. Nothing in this encoding can instantiate arbitrary objects.
//!
//! # Message Flow
//!
//! Typical sequence for a channel:
//!
//! 1. Initiator sends `CONN_REQ`, responder replies `CONN_COMF`
//! 2. Public keys are exchanged via `SHARE_PUBLIC_KEY` / `SERVE_PUBLIC_KEY`
//! 3. The session key is delivered with `START_SYMMETRIC`, confirmed with
//!    `SYMMETRIC_CONFIRMED`
//! 4. Liveness is verified with `PING` / `PONG`
//! 5. Application traffic flows; `FILE_TRANSFER` / `FILE_RECEIVED` and
//!    `MSG_RECEIVED` provide transfer and receipt semantics
//! 6. Either side sends `CLOSE_CONN` before releasing its stream

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProtocolError;

/// Command vocabulary
///
/// The wire form of each command is its token string, preserved verbatim
/// so that both peers agree on the vocabulary byte-for-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Connection request (initiator, step 1)
    ConnReq,
    /// Connection confirmed (responder, step 1)
    ConnComf,
    /// Carries the sender's public key (initiator, step 2)
    SharePublicKey,
    /// Carries the responder's public key (responder, step 2)
    ServePublicKey,
    /// Carries the session symmetric key (initiator, step 3)
    StartSymmetric,
    /// Symmetric key installed (responder, step 3)
    SymmetricConfirmed,
    /// Liveness probe
    Ping,
    /// Liveness reply
    Pong,
    /// Teardown notification
    CloseConn,
    /// Carries a file payload
    FileTransfer,
    /// File payload stored
    FileReceived,
    /// Application-level receipt
    MsgReceived,
}

impl Command {
    /// Wire token for this command
    pub fn as_token(&self) -> &'static str {
        match self {
            Command::ConnReq => "CONN_REQ",
            Command::ConnComf => "CONN_COMF",
            Command::SharePublicKey => "SHARE_PUBLIC_KEY",
            Command::ServePublicKey => "SERVE_PUBLIC_KEY",
            Command::StartSymmetric => "START_SYMMETRIC",
            Command::SymmetricConfirmed => "SYMMETRIC_CONFIRMED",
            Command::Ping => "PING",
            Command::Pong => "PONG",
            Command::CloseConn => "CLOSE_CONN",
            Command::FileTransfer => "FILE_TRANSFER",
            Command::FileReceived => "FILE_RECEIVED",
            Command::MsgReceived => "MSG_RECEIVED",
        }
    }

    /// Parse a wire token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "CONN_REQ" => Some(Command::ConnReq),
            "CONN_COMF" => Some(Command::ConnComf),
            "SHARE_PUBLIC_KEY" => Some(Command::SharePublicKey),
            "SERVE_PUBLIC_KEY" => Some(Command::ServePublicKey),
            "START_SYMMETRIC" => Some(Command::StartSymmetric),
            "SYMMETRIC_CONFIRMED" => Some(Command::SymmetricConfirmed),
            "PING" => Some(Command::Ping),
            "PONG" => Some(Command::Pong),
            "CLOSE_CONN" => Some(Command::CloseConn),
            "FILE_TRANSFER" => Some(Command::FileTransfer),
            "FILE_RECEIVED" => Some(Command::FileReceived),
            "MSG_RECEIVED" => Some(Command::MsgReceived),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_token())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokenVisitor;

        impl Visitor<'_> for TokenVisitor {
            type Value = Command;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a command token")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Command, E> {
                Command::from_token(value)
                    .ok_or_else(|| E::custom(format!("unknown command token: {value:?}")))
            }
        }

        deserializer.deserialize_str(TokenVisitor)
    }
}

/// A field value
///
/// Closed set of plain-data variants; this is the whole of what a peer
/// can put in a message field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 text
    Text(String),
    /// Signed integer
    Number(i64),
    /// Opaque bytes
    Bytes(Bytes),
    /// Nested field map
    Map(BTreeMap<String, Value>),
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

/// A protocol message: command plus named fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    cmd: Command,
    fields: BTreeMap<String, Value>,
}

impl Message {
    /// Create a message with no fields
    pub fn new(cmd: Command) -> Self {
        Self {
            cmd,
            fields: BTreeMap::new(),
        }
    }

    /// Attach a field (builder style)
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The command discriminator
    pub fn command(&self) -> Command {
        self.cmd
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field as text, if present and textual
    pub fn text_field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Field as bytes, if present and binary
    pub fn bytes_field(&self, name: &str) -> Option<&Bytes> {
        match self.fields.get(name) {
            Some(Value::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    /// Field as a number, if present and numeric
    pub fn number_field(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Field as a nested map, if present and a map
    pub fn map_field(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        match self.fields.get(name) {
            Some(Value::Map(m)) => Some(m),
            _ => None,
        }
    }

    /// Serialize into a frame body
    pub fn to_bytes(&self) -> Result<Bytes, ProtocolError> {
        let encoded = bincode::serialize(self)?;
        Ok(Bytes::from(encoded))
    }

    /// Deserialize from a frame body
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(bincode::deserialize(data)?)
    }
}
