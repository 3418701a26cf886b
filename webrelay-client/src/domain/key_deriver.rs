//! Subscription key derivation.
//!
//! A relay subscription key is derived from a peer identifier by keeping only
//! the top 16 bits of the digest prefix and hashing the result. Many peers
//! therefore share a subscription key, and the relay cannot tell which of
//! them a client is listening for.
//!
//! Steps:
//! 1. decode the base58 identifier into code, length and digest
//! 2. take the first 8 digest bytes
//! 3. read them as a big-endian u64
//! 4. shift right (logical) by 48 bits
//! 5. write the result back as 8 big-endian bytes
//! 6. sha2-256 over those 8 bytes
//! 7. wrap the hash as a sha2-256 multihash and base58 encode it

use super::identifier::{DecodeError, EncodedIdentifier, MAX_DIGEST_SIZE, SHA2_256};
use multihash::Multihash;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of digest bytes that feed the derivation.
pub const PREFIX_LEN: usize = 8;

/// Right shift applied to the digest prefix.
pub const PREFIX_SHIFT: u32 = 48;

/// Pubsub topic prefix the relay subscribes under.
pub const MESSAGE_TOPIC_PREFIX: &str = "/offlinemessage/";

/// A derived subscription key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    multihash: Multihash<MAX_DIGEST_SIZE>,
    encoded: String,
}

impl SubscriptionToken {
    fn from_sha256(hash: &[u8]) -> Result<Self, DecodeError> {
        let multihash = Multihash::wrap(SHA2_256, hash)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let encoded = bs58::encode(multihash.to_bytes()).into_string();
        Ok(Self { multihash, encoded })
    }

    /// Base58 text form, as sent in the auth message.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn multihash(&self) -> &Multihash<MAX_DIGEST_SIZE> {
        &self.multihash
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.multihash.to_bytes()
    }

    /// Pubsub topic carrying messages for this key.
    ///
    /// A CIDv0 is a bare sha2-256 multihash, so its text form is the token
    /// itself.
    pub fn topic(&self) -> String {
        format!("{}{}", MESSAGE_TOPIC_PREFIX, self.encoded)
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for SubscriptionToken {
    type Err = DecodeError;

    /// Parse a token received on the wire. Only sha2-256 keys are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = EncodedIdentifier::parse(s)?;
        if id.code() != SHA2_256 {
            return Err(DecodeError::UnknownCode(id.code()));
        }
        Self::from_sha256(id.digest())
    }
}

/// Derive the subscription key for a base58 peer identifier.
pub fn derive(identifier: &str) -> Result<SubscriptionToken, DecodeError> {
    let id = EncodedIdentifier::parse(identifier)?;
    derive_from(&id)
}

/// Derive the subscription key for an already decoded identifier.
pub fn derive_from(identifier: &EncodedIdentifier) -> Result<SubscriptionToken, DecodeError> {
    let prefix = digest_prefix(identifier.digest())?;
    let shifted = shift_prefix(prefix);
    let hash = Sha256::digest(shifted);
    let token = SubscriptionToken::from_sha256(&hash)?;

    tracing::debug!(
        "Derived subscription key {} from prefix {} (shifted {})",
        token,
        hex::encode(prefix),
        hex::encode(shifted)
    );

    Ok(token)
}

/// First [`PREFIX_LEN`] bytes of a digest.
pub fn digest_prefix(digest: &[u8]) -> Result<[u8; PREFIX_LEN], DecodeError> {
    digest
        .get(..PREFIX_LEN)
        .and_then(|slice| <[u8; PREFIX_LEN]>::try_from(slice).ok())
        .ok_or(DecodeError::DigestTooShort {
            required: PREFIX_LEN,
            actual: digest.len(),
        })
}

/// Big-endian u64, logical right shift, fixed-width big-endian re-encode.
pub fn shift_prefix(prefix: [u8; PREFIX_LEN]) -> [u8; PREFIX_LEN] {
    (u64::from_be_bytes(prefix) >> PREFIX_SHIFT).to_be_bytes()
}
