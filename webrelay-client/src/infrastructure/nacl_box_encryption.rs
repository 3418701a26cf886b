//! NaCl box encryption to a peer's Ed25519 key.
//!
//! Wire layout: `nonce (24) || ephemeral public key (32) || box`, where the
//! box is `crypto_box` (X25519 + XSalsa20-Poly1305) between a fresh
//! ephemeral key and the recipient's key converted to Curve25519.

use crate::port::peer_encryption::{PeerEncryption, PeerEncryptionError};
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use ed25519_dalek::{SigningKey, VerifyingKey};

pub const NONCE_SIZE: usize = 24;
pub const KEY_SIZE: usize = 32;

/// Stateless [`PeerEncryption`] over NaCl `crypto_box`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaclBoxEncryption;

impl NaclBoxEncryption {
    pub fn new() -> Self {
        Self
    }
}

fn key_bytes(bytes: &[u8]) -> Result<[u8; KEY_SIZE], PeerEncryptionError> {
    bytes.try_into().map_err(|_| {
        PeerEncryptionError::InvalidKey(format!(
            "expected {} key bytes, got {}",
            KEY_SIZE,
            bytes.len()
        ))
    })
}

impl PeerEncryption for NaclBoxEncryption {
    fn encrypt_for_peer(
        &self,
        recipient_public_key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, PeerEncryptionError> {
        let verifying_key = VerifyingKey::from_bytes(&key_bytes(recipient_public_key)?)
            .map_err(|e| PeerEncryptionError::InvalidKey(e.to_string()))?;
        let recipient = PublicKey::from(verifying_key.to_montgomery().to_bytes());

        let ephemeral = SecretKey::generate(&mut OsRng);
        let nonce = SalsaBox::generate_nonce(&mut OsRng);
        let sealed = SalsaBox::new(&recipient, &ephemeral)
            .encrypt(&nonce, plaintext)
            .map_err(|e| PeerEncryptionError::CryptoError(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + KEY_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(ephemeral.public_key().as_bytes());
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt_from_peer(
        &self,
        recipient_private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, PeerEncryptionError> {
        let header = NONCE_SIZE + KEY_SIZE;
        if ciphertext.len() < header {
            return Err(PeerEncryptionError::CiphertextTooShort {
                required: header,
                actual: ciphertext.len(),
            });
        }
        let (nonce, rest) = ciphertext.split_at(NONCE_SIZE);
        let (ephemeral, sealed) = rest.split_at(KEY_SIZE);

        let signing_key = SigningKey::from_bytes(&key_bytes(recipient_private_key)?);
        let secret = SecretKey::from(signing_key.to_scalar_bytes());
        let ephemeral = PublicKey::from(key_bytes(ephemeral)?);

        SalsaBox::new(&ephemeral, &secret)
            .decrypt(GenericArray::from_slice(nonce), sealed)
            .map_err(|e| PeerEncryptionError::CryptoError(e.to_string()))
    }
}
