//! Key management and encryption policy
//!
//! A [`KeyManager`] owns one side's key material for the lifetime of its
//! channel: an X25519 keypair generated at construction, the peer's public
//! key once the handshake delivers it, and the session symmetric key. Each
//! piece of peer-supplied material is installed exactly once.
//!
//! Three encryption modes cover the channel lifecycle:
//!
//! - `Plaintext` — identity transform, only for the handshake steps that
//!   run before any key exists. It must be selected explicitly; once a
//!   session claims readiness there is no silent fallback to plaintext.
//! - `Asymmetric` — sealed-box encryption to the peer's public key
//!   (ephemeral X25519 + HKDF-SHA256 + ChaCha20-Poly1305), used to deliver
//!   the symmetric key. Capacity-bounded: it carries short bootstrap
//!   secrets, nothing else.
//! - `Symmetric` — ChaCha20-Poly1305 under the session key for all
//!   steady-state traffic.

use bytes::Bytes;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::CryptoError;

/// Length of an X25519 public key
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of the session symmetric key
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// ChaCha20-Poly1305 nonce length
const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 authentication tag length
const TAG_LEN: usize = 16;

/// Maximum plaintext accepted in asymmetric mode
///
/// Asymmetric mode exists to deliver the session key and nothing larger;
/// oversized input is rejected outright rather than truncated.
pub const ASYMMETRIC_CAPACITY: usize = 256;

/// HKDF info string for sealed-box key derivation
const HKDF_INFO: &[u8] = b"SEALWIRE-V1-SEALED";

/// Encryption policy for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMode {
    /// Identity transform (pre-key handshake steps only)
    Plaintext,
    /// Sealed to the peer's public key
    Asymmetric,
    /// AEAD under the session key
    Symmetric,
}

/// Holds one terminal's cryptographic material and performs
/// encrypt/decrypt under a selected [`EncryptionMode`]
pub struct KeyManager {
    secret: StaticSecret,
    public: PublicKey,
    peer_public: Option<PublicKey>,
    symmetric: Option<ChaCha20Poly1305>,
}

impl KeyManager {
    /// Create a manager with a freshly generated keypair
    pub fn new() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            secret,
            public,
            peer_public: None,
            symmetric: None,
        }
    }

    /// This side's public key, as sent during the handshake
    pub fn public_key_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.public.as_bytes())
    }

    /// Install the peer's public key
    ///
    /// Rejects empty or malformed keys, and double installation.
    pub fn set_peer_public_key(&mut self, raw: &[u8]) -> Result<(), CryptoError> {
        if self.peer_public.is_some() {
            return Err(CryptoError::KeyAlreadySet);
        }
        if raw.is_empty() {
            return Err(CryptoError::EmptyPeerKey);
        }
        let key: [u8; PUBLIC_KEY_LEN] = raw
            .try_into()
            .map_err(|_| CryptoError::InvalidPeerKey(raw.len()))?;

        self.peer_public = Some(PublicKey::from(key));
        Ok(())
    }

    /// Whether the peer's public key has been installed
    pub fn has_peer_public_key(&self) -> bool {
        self.peer_public.is_some()
    }

    /// Generate, install, and return a fresh session key
    pub fn generate_symmetric_key(&mut self) -> Result<Bytes, CryptoError> {
        if self.symmetric.is_some() {
            return Err(CryptoError::KeyAlreadySet);
        }
        let mut key = [0u8; SYMMETRIC_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        self.install_symmetric(&key)?;
        Ok(Bytes::copy_from_slice(&key))
    }

    /// Install a peer-supplied session key
    pub fn set_symmetric_key(&mut self, raw: &[u8]) -> Result<(), CryptoError> {
        if self.symmetric.is_some() {
            return Err(CryptoError::KeyAlreadySet);
        }
        if raw.len() != SYMMETRIC_KEY_LEN {
            return Err(CryptoError::InvalidSymmetricKey(raw.len()));
        }
        self.install_symmetric(raw)
    }

    /// Whether the session key has been installed
    pub fn has_symmetric_key(&self) -> bool {
        self.symmetric.is_some()
    }

    fn install_symmetric(&mut self, raw: &[u8]) -> Result<(), CryptoError> {
        let cipher = ChaCha20Poly1305::new_from_slice(raw)
            .map_err(|_| CryptoError::InvalidSymmetricKey(raw.len()))?;
        self.symmetric = Some(cipher);
        Ok(())
    }

    /// Encrypt a payload under the given mode
    pub fn encrypt(&self, plain: &[u8], mode: EncryptionMode) -> Result<Bytes, CryptoError> {
        match mode {
            EncryptionMode::Plaintext => Ok(Bytes::copy_from_slice(plain)),
            EncryptionMode::Symmetric => self.encrypt_symmetric(plain),
            EncryptionMode::Asymmetric => self.seal(plain),
        }
    }

    /// Decrypt a payload under the given mode
    pub fn decrypt(&self, body: &[u8], mode: EncryptionMode) -> Result<Bytes, CryptoError> {
        match mode {
            EncryptionMode::Plaintext => Ok(Bytes::copy_from_slice(body)),
            EncryptionMode::Symmetric => self.decrypt_symmetric(body),
            EncryptionMode::Asymmetric => self.open(body),
        }
    }

    /// Symmetric AEAD: `nonce(12) || ciphertext`
    fn encrypt_symmetric(&self, plain: &[u8]) -> Result<Bytes, CryptoError> {
        let cipher = self
            .symmetric
            .as_ref()
            .ok_or(CryptoError::SymmetricKeyMissing)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plain)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(Bytes::from(out))
    }

    fn decrypt_symmetric(&self, body: &[u8]) -> Result<Bytes, CryptoError> {
        let cipher = self
            .symmetric
            .as_ref()
            .ok_or(CryptoError::SymmetricKeyMissing)?;

        if body.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::CiphertextTooShort);
        }

        let nonce = Nonce::from_slice(&body[..NONCE_LEN]);
        let plain = cipher
            .decrypt(nonce, &body[NONCE_LEN..])
            .map_err(|_| CryptoError::AuthenticationFailed)?;
        Ok(Bytes::from(plain))
    }

    /// Sealed box: `ephemeral_public(32) || nonce(12) || ciphertext`
    fn seal(&self, plain: &[u8]) -> Result<Bytes, CryptoError> {
        let peer = self.peer_public.ok_or(CryptoError::PeerKeyMissing)?;

        if plain.len() > ASYMMETRIC_CAPACITY {
            return Err(CryptoError::PayloadTooLarge {
                size: plain.len(),
                max: ASYMMETRIC_CAPACITY,
            });
        }

        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&peer);

        let key = derive_sealed_key(shared.as_bytes())?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| CryptoError::KeyDerivation)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plain)
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        let mut out = Vec::with_capacity(PUBLIC_KEY_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(Bytes::from(out))
    }

    fn open(&self, body: &[u8]) -> Result<Bytes, CryptoError> {
        if body.len() < PUBLIC_KEY_LEN + NONCE_LEN + TAG_LEN {
            return Err(CryptoError::CiphertextTooShort);
        }

        let mut ephemeral = [0u8; PUBLIC_KEY_LEN];
        ephemeral.copy_from_slice(&body[..PUBLIC_KEY_LEN]);
        let ephemeral_public = PublicKey::from(ephemeral);

        let shared = self.secret.diffie_hellman(&ephemeral_public);
        let key = derive_sealed_key(shared.as_bytes())?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| CryptoError::KeyDerivation)?;

        let nonce = Nonce::from_slice(&body[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + NONCE_LEN]);
        let plain = cipher
            .decrypt(nonce, &body[PUBLIC_KEY_LEN + NONCE_LEN..])
            .map_err(|_| CryptoError::AuthenticationFailed)?;
        Ok(Bytes::from(plain))
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_sealed_key(shared: &[u8]) -> Result<[u8; SYMMETRIC_KEY_LEN], CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, shared);
    let mut key = [0u8; SYMMETRIC_KEY_LEN];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|_| CryptoError::KeyDerivation)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A pair of managers that have exchanged public keys
    fn linked_pair() -> (KeyManager, KeyManager) {
        let mut a = KeyManager::new();
        let mut b = KeyManager::new();
        let a_pub = a.public_key_bytes();
        let b_pub = b.public_key_bytes();
        a.set_peer_public_key(&b_pub).unwrap();
        b.set_peer_public_key(&a_pub).unwrap();
        (a, b)
    }

    #[test]
    fn test_plaintext_roundtrip() {
        let km = KeyManager::new();
        let plain = b"in the clear";
        let body = km.encrypt(plain, EncryptionMode::Plaintext).unwrap();
        assert_eq!(body.as_ref(), plain);
        let out = km.decrypt(&body, EncryptionMode::Plaintext).unwrap();
        assert_eq!(out.as_ref(), plain);
    }

    #[test]
    fn test_symmetric_roundtrip() {
        let mut a = KeyManager::new();
        let mut b = KeyManager::new();

        let key = a.generate_symmetric_key().unwrap();
        b.set_symmetric_key(&key).unwrap();

        let body = a.encrypt(b"steady state", EncryptionMode::Symmetric).unwrap();
        assert_ne!(body.as_ref(), b"steady state".as_slice());
        let out = b.decrypt(&body, EncryptionMode::Symmetric).unwrap();
        assert_eq!(out.as_ref(), b"steady state");
    }

    #[test]
    fn test_symmetric_requires_key() {
        let km = KeyManager::new();
        assert!(matches!(
            km.encrypt(b"x", EncryptionMode::Symmetric),
            Err(CryptoError::SymmetricKeyMissing)
        ));
        assert!(matches!(
            km.decrypt(&[0u8; 64], EncryptionMode::Symmetric),
            Err(CryptoError::SymmetricKeyMissing)
        ));
    }

    #[test]
    fn test_symmetric_detects_tampering() {
        let mut a = KeyManager::new();
        let mut b = KeyManager::new();
        let key = a.generate_symmetric_key().unwrap();
        b.set_symmetric_key(&key).unwrap();

        let body = a.encrypt(b"payload", EncryptionMode::Symmetric).unwrap();
        let mut tampered = body.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;

        assert!(matches!(
            b.decrypt(&tampered, EncryptionMode::Symmetric),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_symmetric_wrong_key_fails() {
        let mut a = KeyManager::new();
        let mut b = KeyManager::new();
        a.generate_symmetric_key().unwrap();
        b.generate_symmetric_key().unwrap();

        let body = a.encrypt(b"payload", EncryptionMode::Symmetric).unwrap();
        assert!(matches!(
            b.decrypt(&body, EncryptionMode::Symmetric),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_asymmetric_roundtrip() {
        let (a, b) = linked_pair();

        let body = a.encrypt(b"bootstrap secret", EncryptionMode::Asymmetric).unwrap();
        let out = b.decrypt(&body, EncryptionMode::Asymmetric).unwrap();
        assert_eq!(out.as_ref(), b"bootstrap secret");
    }

    #[test]
    fn test_asymmetric_requires_peer_key() {
        let km = KeyManager::new();
        assert!(matches!(
            km.encrypt(b"x", EncryptionMode::Asymmetric),
            Err(CryptoError::PeerKeyMissing)
        ));
    }

    #[test]
    fn test_asymmetric_capacity_enforced() {
        let (a, _) = linked_pair();
        let oversized = vec![0u8; ASYMMETRIC_CAPACITY + 1];
        assert!(matches!(
            a.encrypt(&oversized, EncryptionMode::Asymmetric),
            Err(CryptoError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_asymmetric_wrong_recipient_fails() {
        let (a, _) = linked_pair();
        let stranger = KeyManager::new();

        let body = a.encrypt(b"secret", EncryptionMode::Asymmetric).unwrap();
        assert!(matches!(
            stranger.decrypt(&body, EncryptionMode::Asymmetric),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_asymmetric_short_ciphertext() {
        let km = KeyManager::new();
        assert!(matches!(
            km.decrypt(&[0u8; 10], EncryptionMode::Asymmetric),
            Err(CryptoError::CiphertextTooShort)
        ));
    }

    #[test]
    fn test_empty_peer_key_rejected() {
        let mut km = KeyManager::new();
        assert!(matches!(
            km.set_peer_public_key(&[]),
            Err(CryptoError::EmptyPeerKey)
        ));
        assert!(!km.has_peer_public_key());
    }

    #[test]
    fn test_malformed_peer_key_rejected() {
        let mut km = KeyManager::new();
        assert!(matches!(
            km.set_peer_public_key(&[1, 2, 3]),
            Err(CryptoError::InvalidPeerKey(3))
        ));
    }

    #[test]
    fn test_peer_key_set_once() {
        let (mut a, b) = linked_pair();
        assert!(matches!(
            a.set_peer_public_key(&b.public_key_bytes()),
            Err(CryptoError::KeyAlreadySet)
        ));
    }

    #[test]
    fn test_symmetric_key_set_once() {
        let mut km = KeyManager::new();
        km.generate_symmetric_key().unwrap();
        assert!(matches!(
            km.set_symmetric_key(&[0u8; SYMMETRIC_KEY_LEN]),
            Err(CryptoError::KeyAlreadySet)
        ));
        assert!(matches!(
            km.generate_symmetric_key(),
            Err(CryptoError::KeyAlreadySet)
        ));
    }

    #[test]
    fn test_symmetric_key_length_checked() {
        let mut km = KeyManager::new();
        assert!(matches!(
            km.set_symmetric_key(&[0u8; 16]),
            Err(CryptoError::InvalidSymmetricKey(16))
        ));
    }
}
