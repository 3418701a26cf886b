//! PeerEncryption trait - Abstract interface for sealing payloads to a peer

/// Errors raised while sealing or opening a peer payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerEncryptionError {
    /// The key bytes do not form a usable key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The peer identifier does not inline an Ed25519 public key.
    #[error("peer {0} has no inlined ed25519 key")]
    NotEd25519(String),

    /// The ciphertext is too short to hold the nonce and ephemeral key.
    #[error("ciphertext too short: need at least {required} bytes, got {actual}")]
    CiphertextTooShort { required: usize, actual: usize },

    /// Sealing or opening the box failed.
    #[error("crypto error: {0}")]
    CryptoError(String),
}

/// Seals payloads for a recipient's Ed25519 key and opens them again.
///
/// Implementations convert the Ed25519 keys to their Curve25519 form; the
/// caller only deals in the peer's signing key material.
pub trait PeerEncryption: Send + Sync {
    /// Encrypt `plaintext` for the holder of `recipient_public_key`
    /// (32 Ed25519 public key bytes).
    fn encrypt_for_peer(
        &self,
        recipient_public_key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, PeerEncryptionError>;

    /// Open a payload produced by [`PeerEncryption::encrypt_for_peer`] with
    /// the recipient's 32-byte Ed25519 secret key.
    fn decrypt_from_peer(
        &self,
        recipient_private_key: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, PeerEncryptionError>;
}
