//! Sealing payloads for offline delivery through the relay.

use crate::domain::identifier::EncodedIdentifier;
use crate::domain::messages::EncryptedMessage;
use crate::port::peer_encryption::{PeerEncryption, PeerEncryptionError};
use anyhow::{Context, Result};

/// Encrypt `plaintext` for `recipient` and wrap it as an outgoing
/// [`EncryptedMessage`].
///
/// The recipient must be an identity peer ID carrying its Ed25519 key;
/// hashed peer IDs do not reveal the key needed to seal the box.
pub fn seal_for_peer<E>(encryption: &E, recipient: &str, plaintext: &[u8]) -> Result<EncryptedMessage>
where
    E: PeerEncryption + ?Sized,
{
    let id = EncodedIdentifier::parse(recipient)
        .with_context(|| format!("Invalid recipient peer ID {}", recipient))?;
    let public_key = id
        .ed25519_public_key()
        .ok_or_else(|| PeerEncryptionError::NotEd25519(recipient.to_string()))?;

    let ciphertext = encryption.encrypt_for_peer(&public_key, plaintext)?;
    tracing::debug!(
        "Sealed {} bytes for {} ({} bytes on the wire)",
        plaintext.len(),
        recipient,
        ciphertext.len()
    );

    Ok(EncryptedMessage::for_recipient(recipient, &ciphertext)?)
}

/// Decrypt a received message with the local peer's Ed25519 secret key.
pub fn open_message<E>(
    encryption: &E,
    private_key: &[u8],
    message: &EncryptedMessage,
) -> Result<Vec<u8>>
where
    E: PeerEncryption + ?Sized,
{
    let ciphertext = message
        .decode_payload()
        .with_context(|| format!("Message {} has no valid payload", message.id))?;
    encryption
        .decrypt_from_peer(private_key, &ciphertext)
        .with_context(|| format!("Failed to open message {}", message.id))
}
