//! Channel terminal facade
//!
//! A [`ChannelTerminal`] is one side's handle to a channel: it exclusively
//! owns the stream and its key material, and it is the only type
//! application code touches after the handshake. Operations are strictly
//! sequential — the contract forbids driving one terminal from multiple
//! tasks, so no internal locking exists. Independent terminals are fully
//! concurrent.

use std::path::{Path, PathBuf};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Framed;

use sw_protocol::{Command, FrameCodec, Message, ProtocolError};

use crate::config::ChannelConfig;
use crate::crypto::{EncryptionMode, KeyManager};
use crate::error::ChannelError;
use crate::fs;
use crate::handshake::HandshakeState;

/// One side's handle to an encrypted channel
pub struct ChannelTerminal<S> {
    pub(crate) framed: Framed<S, FrameCodec>,
    pub(crate) keys: KeyManager,
    pub(crate) state: HandshakeState,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ChannelTerminal<S> {
    /// Wrap a connected duplex stream with the default configuration
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ChannelConfig::default())
    }

    /// Wrap a connected duplex stream
    pub fn with_config(stream: S, config: ChannelConfig) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec::with_limit(config.max_body_len)),
            keys: KeyManager::new(),
            state: HandshakeState::Init,
        }
    }

    /// Current handshake progress
    pub fn handshake_state(&self) -> HandshakeState {
        self.state
    }

    /// Whether the handshake has completed successfully
    pub fn is_ready(&self) -> bool {
        self.state == HandshakeState::Ready
    }

    /// Send a message under symmetric encryption
    pub async fn send_message(&mut self, msg: &Message) -> Result<(), ChannelError> {
        self.send_message_as(msg, EncryptionMode::Symmetric).await
    }

    /// Send a message under an explicit encryption mode
    pub async fn send_message_as(
        &mut self,
        msg: &Message,
        mode: EncryptionMode,
    ) -> Result<(), ChannelError> {
        let plain = msg.to_bytes()?;
        let body = self.keys.encrypt(&plain, mode)?;
        self.framed.send(body).await?;
        Ok(())
    }

    /// Receive a message under symmetric encryption
    pub async fn recv_message(&mut self) -> Result<Message, ChannelError> {
        self.recv_message_as(EncryptionMode::Symmetric).await
    }

    /// Receive a message under an explicit encryption mode
    pub async fn recv_message_as(
        &mut self,
        mode: EncryptionMode,
    ) -> Result<Message, ChannelError> {
        let body = match self.framed.next().await {
            Some(result) => result?,
            None => return Err(ProtocolError::ConnectionClosed.into()),
        };
        let plain = self.keys.decrypt(&body, mode)?;
        Ok(Message::from_bytes(&plain)?)
    }

    /// Send a message and wait for the peer's `MSG_RECEIVED` receipt
    pub async fn send_acknowledged(&mut self, msg: &Message) -> Result<(), ChannelError> {
        self.send_message(msg).await?;
        let reply = self.recv_message().await?;
        if reply.command() != Command::MsgReceived {
            return Err(ChannelError::UnexpectedMessage(reply.command()));
        }
        Ok(())
    }

    /// Send a `MSG_RECEIVED` receipt for the last message
    pub async fn acknowledge(&mut self) -> Result<(), ChannelError> {
        self.send_message(&Message::new(Command::MsgReceived)).await
    }

    /// Read a file and send it as a `FILE_TRANSFER` message, waiting for
    /// the peer's `FILE_RECEIVED` confirmation
    pub async fn send_file(&mut self, path: impl AsRef<Path>) -> Result<(), ChannelError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ChannelError::InvalidFileName(path.display().to_string()))?;

        let data = fs::read_file_bytes(path).await?;
        let msg = Message::new(Command::FileTransfer)
            .with_field("name", name)
            .with_field("data", data);
        self.send_message(&msg).await?;

        let reply = self.recv_message().await?;
        if reply.command() != Command::FileReceived {
            return Err(ChannelError::UnexpectedMessage(reply.command()));
        }
        tracing::debug!("File {:?} transferred", name);
        Ok(())
    }

    /// Store a received `FILE_TRANSFER` payload under `dir` and reply with
    /// `FILE_RECEIVED`
    ///
    /// The peer-supplied name is accepted only as a bare file name; paths
    /// that would escape `dir` are rejected.
    pub async fn receive_file(
        &mut self,
        msg: &Message,
        dir: &Path,
    ) -> Result<PathBuf, ChannelError> {
        if msg.command() != Command::FileTransfer {
            return Err(ChannelError::UnexpectedMessage(msg.command()));
        }

        let name = msg
            .text_field("name")
            .ok_or(ChannelError::MissingField("name"))?;
        let name_path = Path::new(name);
        let is_bare_name = name_path.components().count() == 1 && name_path.file_name().is_some();
        if name.is_empty() || !is_bare_name {
            return Err(ChannelError::InvalidFileName(name.to_string()));
        }

        let data = msg
            .bytes_field("data")
            .ok_or(ChannelError::MissingField("data"))?;

        let dest = dir.join(name_path);
        fs::write_file_bytes(&dest, data).await?;
        self.send_message(&Message::new(Command::FileReceived)).await?;
        tracing::debug!("File {:?} stored at {:?}", name, dest);
        Ok(dest)
    }

    /// Notify the peer and release the stream
    ///
    /// The `CLOSE_CONN` notification is best effort: a failure to deliver
    /// it is logged and never prevents the stream from being shut down and
    /// released.
    pub async fn close(mut self) -> Result<(), ChannelError> {
        if let Err(e) = self.send_message(&Message::new(Command::CloseConn)).await {
            tracing::debug!("Close notification failed: {}", e);
        }
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }
}
