//! Handshake state machine
//!
//! A fixed five-step request/confirm sequence that establishes mutual key
//! material and verifies liveness before application traffic is permitted:
//!
//! 1. `CONN_REQ` / `CONN_COMF` in plaintext — the peers agree to talk
//! 2. `SHARE_PUBLIC_KEY` / `SERVE_PUBLIC_KEY` in plaintext — public keys
//!    are exchanged and installed
//! 3. `START_SYMMETRIC` / `SYMMETRIC_CONFIRMED` in asymmetric mode — the
//!    initiator generates the session key and delivers it sealed to the
//!    responder's public key
//! 4. `PING` / `PONG` in symmetric mode — both sides prove they hold the
//!    session key
//! 5. Ready
//!
//! The per-step confirm lets each side know exactly which key material the
//! other already holds before trusting it, and the per-step mode switch
//! (plaintext, then asymmetric, then symmetric) bootstraps confidentiality
//! without requiring symmetric material before it exists.
//!
//! There is no retry: any unexpected command, missing or empty key field,
//! or transport failure is immediately terminal. The first exchange runs
//! in the clear, so this handshake does not defend against an active
//! interceptor; it establishes confidentiality against passive observers
//! only.

use tokio::io::{AsyncRead, AsyncWrite};

use sw_protocol::{Command, Message};

use crate::crypto::EncryptionMode;
use crate::error::HandshakeError;
use crate::terminal::ChannelTerminal;

/// Progress of the handshake on one terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No handshake traffic yet
    Init,
    /// `CONN_REQ` sent (initiator) or received (responder)
    ConnRequested,
    /// `CONN_COMF` exchanged
    ConnConfirmed,
    /// Peer public key installed
    PubkeyExchanged,
    /// Session key installed and confirmed
    SymkeyExchanged,
    /// Liveness verified; application traffic permitted
    Ready,
    /// Terminal failure
    Failed(HandshakeFailure),
}

/// Category of a terminal handshake failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// Unexpected control message or stream failure
    Connection,
    /// Missing/empty key material or a decrypt failure
    Encryption,
}

impl HandshakeFailure {
    /// Wire-level failure token
    pub fn token(&self) -> &'static str {
        match self {
            HandshakeFailure::Connection => "CONN_ERROR",
            HandshakeFailure::Encryption => "ENCRYPTION_ERROR",
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> ChannelTerminal<S> {
    /// Run the handshake as the initiating side
    pub async fn initialize_as_initiator(&mut self) -> Result<(), HandshakeError> {
        match self.run_initiator().await {
            Ok(()) => {
                self.state = HandshakeState::Ready;
                tracing::debug!("Handshake complete (initiator)");
                Ok(())
            }
            Err(e) => {
                self.state = HandshakeState::Failed(e.failure());
                tracing::warn!("Handshake failed (initiator): {}", e);
                Err(e)
            }
        }
    }

    /// Run the handshake as the responding side
    pub async fn initialize_as_responder(&mut self) -> Result<(), HandshakeError> {
        match self.run_responder().await {
            Ok(()) => {
                self.state = HandshakeState::Ready;
                tracing::debug!("Handshake complete (responder)");
                Ok(())
            }
            Err(e) => {
                self.state = HandshakeState::Failed(e.failure());
                tracing::warn!("Handshake failed (responder): {}", e);
                Err(e)
            }
        }
    }

    async fn run_initiator(&mut self) -> Result<(), HandshakeError> {
        // Step 1: request the connection in the clear
        self.step_send(&Message::new(Command::ConnReq), EncryptionMode::Plaintext)
            .await?;
        self.state = HandshakeState::ConnRequested;

        let reply = self.step_recv(EncryptionMode::Plaintext).await?;
        if reply.command() != Command::ConnComf {
            return Err(HandshakeError::Connection(format!(
                "expected CONN_COMF, got {}",
                reply.command()
            )));
        }
        self.state = HandshakeState::ConnConfirmed;
        tracing::debug!("Connection confirmed");

        // Step 2: exchange public keys
        let share = Message::new(Command::SharePublicKey)
            .with_field("key", self.keys.public_key_bytes());
        self.step_send(&share, EncryptionMode::Plaintext).await?;

        let reply = self.step_recv(EncryptionMode::Plaintext).await?;
        let peer_key = match (reply.command(), reply.bytes_field("key")) {
            (Command::ServePublicKey, Some(key)) if !key.is_empty() => key.clone(),
            _ => {
                return Err(HandshakeError::Encryption(format!(
                    "expected SERVE_PUBLIC_KEY with a non-empty key, got {}",
                    reply.command()
                )))
            }
        };
        self.keys
            .set_peer_public_key(&peer_key)
            .map_err(|e| HandshakeError::Encryption(e.to_string()))?;
        self.state = HandshakeState::PubkeyExchanged;
        tracing::debug!("Peer public key installed");

        // Step 3: deliver the session key sealed to the peer
        let session_key = self
            .keys
            .generate_symmetric_key()
            .map_err(|e| HandshakeError::Encryption(e.to_string()))?;
        let start = Message::new(Command::StartSymmetric).with_field("key", session_key);
        self.step_send(&start, EncryptionMode::Asymmetric).await?;

        let reply = self.step_recv(EncryptionMode::Asymmetric).await?;
        if reply.command() != Command::SymmetricConfirmed {
            return Err(HandshakeError::Encryption(format!(
                "expected SYMMETRIC_CONFIRMED, got {}",
                reply.command()
            )));
        }
        self.state = HandshakeState::SymkeyExchanged;
        tracing::debug!("Session key confirmed");

        // Step 4: prove liveness under the session key
        self.step_send(&Message::new(Command::Ping), EncryptionMode::Symmetric)
            .await?;
        let reply = self.step_recv(EncryptionMode::Symmetric).await?;
        if reply.command() != Command::Pong {
            return Err(HandshakeError::Connection(format!(
                "expected PONG, got {}",
                reply.command()
            )));
        }

        Ok(())
    }

    async fn run_responder(&mut self) -> Result<(), HandshakeError> {
        // Step 1: accept the connection request
        let msg = self.step_recv(EncryptionMode::Plaintext).await?;
        if msg.command() != Command::ConnReq {
            return Err(HandshakeError::Connection(format!(
                "expected CONN_REQ, got {}",
                msg.command()
            )));
        }
        self.state = HandshakeState::ConnRequested;
        self.step_send(&Message::new(Command::ConnComf), EncryptionMode::Plaintext)
            .await?;
        self.state = HandshakeState::ConnConfirmed;
        tracing::debug!("Connection confirmed");

        // Step 2: receive the initiator's key, serve our own
        let msg = self.step_recv(EncryptionMode::Plaintext).await?;
        let peer_key = match (msg.command(), msg.bytes_field("key")) {
            (Command::SharePublicKey, Some(key)) if !key.is_empty() => key.clone(),
            _ => {
                return Err(HandshakeError::Encryption(format!(
                    "expected SHARE_PUBLIC_KEY with a non-empty key, got {}",
                    msg.command()
                )))
            }
        };
        self.keys
            .set_peer_public_key(&peer_key)
            .map_err(|e| HandshakeError::Encryption(e.to_string()))?;

        let serve = Message::new(Command::ServePublicKey)
            .with_field("key", self.keys.public_key_bytes());
        self.step_send(&serve, EncryptionMode::Plaintext).await?;
        self.state = HandshakeState::PubkeyExchanged;
        tracing::debug!("Peer public key installed");

        // Step 3: install the sealed session key
        let msg = self.step_recv(EncryptionMode::Asymmetric).await?;
        let session_key = match (msg.command(), msg.bytes_field("key")) {
            (Command::StartSymmetric, Some(key)) if !key.is_empty() => key.clone(),
            _ => {
                return Err(HandshakeError::Encryption(format!(
                    "expected START_SYMMETRIC with a non-empty key, got {}",
                    msg.command()
                )))
            }
        };
        self.keys
            .set_symmetric_key(&session_key)
            .map_err(|e| HandshakeError::Encryption(e.to_string()))?;
        self.step_send(
            &Message::new(Command::SymmetricConfirmed),
            EncryptionMode::Asymmetric,
        )
        .await?;
        self.state = HandshakeState::SymkeyExchanged;
        tracing::debug!("Session key installed");

        // Step 4: answer the liveness probe
        let msg = self.step_recv(EncryptionMode::Symmetric).await?;
        if msg.command() != Command::Ping {
            return Err(HandshakeError::Connection(format!(
                "expected PING, got {}",
                msg.command()
            )));
        }
        self.step_send(&Message::new(Command::Pong), EncryptionMode::Symmetric)
            .await?;

        Ok(())
    }

    async fn step_send(
        &mut self,
        msg: &Message,
        mode: EncryptionMode,
    ) -> Result<(), HandshakeError> {
        self.send_message_as(msg, mode)
            .await
            .map_err(HandshakeError::from_channel)
    }

    async fn step_recv(&mut self, mode: EncryptionMode) -> Result<Message, HandshakeError> {
        self.recv_message_as(mode)
            .await
            .map_err(HandshakeError::from_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_tokens() {
        assert_eq!(HandshakeFailure::Connection.token(), "CONN_ERROR");
        assert_eq!(HandshakeFailure::Encryption.token(), "ENCRYPTION_ERROR");
    }
}
