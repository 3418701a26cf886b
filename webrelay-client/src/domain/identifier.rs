//! Self-describing identifiers (multihashes) in their base58 text form.
//!
//! Peer identifiers and subscription keys share the same wire shape:
//! `<varint code><varint length><digest>`, written out as base58btc text
//! without a multibase prefix.

use multihash::Multihash;
use std::fmt;
use std::str::FromStr;

/// Multihash code for the identity "hash" (inlined key material).
pub const IDENTITY: u64 = 0x00;

/// Multihash code for sha2-256.
pub const SHA2_256: u64 = 0x12;

/// Largest digest an identifier may carry.
pub const MAX_DIGEST_SIZE: usize = 64;

/// Protobuf header of an inlined Ed25519 public key
/// (`KeyType = Ed25519`, `Data` of 32 bytes).
const ED25519_KEY_HEADER: [u8; 4] = [0x08, 0x01, 0x12, 0x20];

/// Errors raised while decoding an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base58 text: {0}")]
    InvalidBase58(String),

    #[error("malformed identifier: {0}")]
    Malformed(String),

    #[error("unknown hash function code: {0:#x}")]
    UnknownCode(u64),

    #[error("digest too short: need at least {required} bytes, got {actual}")]
    DigestTooShort { required: usize, actual: usize },
}

/// A decoded self-describing identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedIdentifier(Multihash<MAX_DIGEST_SIZE>);

impl EncodedIdentifier {
    /// Decode an identifier from its base58 text.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|e| DecodeError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Decode an identifier from its binary form.
    ///
    /// The declared length must match the number of digest bytes exactly,
    /// and the code must name a known hash function.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mh = Multihash::<MAX_DIGEST_SIZE>::from_bytes(bytes)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        Self::from_multihash(mh)
    }

    /// Wrap an already parsed multihash, validating its code.
    pub fn from_multihash(mh: Multihash<MAX_DIGEST_SIZE>) -> Result<Self, DecodeError> {
        if !is_known_code(mh.code()) {
            return Err(DecodeError::UnknownCode(mh.code()));
        }
        Ok(Self(mh))
    }

    /// Hash function code (the tag).
    pub fn code(&self) -> u64 {
        self.0.code()
    }

    /// Declared digest length.
    pub fn size(&self) -> u8 {
        self.0.size()
    }

    pub fn digest(&self) -> &[u8] {
        self.0.digest()
    }

    /// Binary form: code, length, digest.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Base58 text form.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0.to_bytes()).into_string()
    }

    pub fn multihash(&self) -> &Multihash<MAX_DIGEST_SIZE> {
        &self.0
    }

    /// Ed25519 public key inlined in an identity peer ID.
    ///
    /// Returns `None` for hashed identifiers and other key types.
    pub fn ed25519_public_key(&self) -> Option<[u8; 32]> {
        if self.code() != IDENTITY {
            return None;
        }
        let key = self.digest().strip_prefix(&ED25519_KEY_HEADER[..])?;
        key.try_into().ok()
    }
}

/// Name of the hash function registered under `code`, if any.
///
/// Covers the full multihash table, including the blake2 and skein
/// families (one code per digest length) and the application-specific
/// range `0x01..=0x0f`.
pub fn hash_function_name(code: u64) -> Option<&'static str> {
    let name = match code {
        0x00 => "identity",
        0x01..=0x0f => "app-specific",
        0x11 => "sha1",
        0x12 => "sha2-256",
        0x13 => "sha2-512",
        0x14 => "sha3-512",
        0x15 => "sha3-384",
        0x16 => "sha3-256",
        0x17 => "sha3-224",
        0x18 => "shake-128",
        0x19 => "shake-256",
        0x1a => "keccak-224",
        0x1b => "keccak-256",
        0x1c => "keccak-384",
        0x1d => "keccak-512",
        0x1e => "blake3",
        0x22 => "murmur3-128",
        0x23 => "murmur3-32",
        0x56 => "dbl-sha2-256",
        0xd4 => "md4",
        0xd5 => "md5",
        0xd6 => "bmt",
        0x1012 => "sha2-256-trunc254-padded",
        0x1052 => "ripemd-128",
        0x1053 => "ripemd-160",
        0x1054 => "ripemd-256",
        0x1055 => "ripemd-320",
        0x1100 => "x11",
        0x534d => "sm3-256",
        0xb201..=0xb240 => "blake2b",
        0xb241..=0xb260 => "blake2s",
        0xb301..=0xb320 => "skein256",
        0xb321..=0xb360 => "skein512",
        0xb361..=0xb3e0 => "skein1024",
        _ => return None,
    };
    Some(name)
}

fn is_known_code(code: u64) -> bool {
    hash_function_name(code).is_some()
}

impl FromStr for EncodedIdentifier {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EncodedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER_ID: &str = "QmaSAmPPynrWfz1R8XvRm1GX6ghzPze6XSZCov6fWWUzSg";

    #[test]
    fn test_parse_peer_id() {
        let id = EncodedIdentifier::parse(PEER_ID).unwrap();
        assert_eq!(id.code(), SHA2_256);
        assert_eq!(id.size(), 32);
        assert_eq!(id.digest().len(), 32);
        assert_eq!(
            hex::encode(&id.digest()[..8]),
            "b3b621d91d96bff0"
        );
    }

    #[test]
    fn test_display_matches_input() {
        let id: EncodedIdentifier = PEER_ID.parse().unwrap();
        assert_eq!(id.to_string(), PEER_ID);
        assert_eq!(id.to_base58(), PEER_ID);
    }

    #[test]
    fn test_rejects_invalid_alphabet() {
        // '0', 'O', 'I' and 'l' are not part of the base58 alphabet
        let err = EncodedIdentifier::parse("Qm0OIl").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBase58(_)));
    }

    #[test]
    fn test_rejects_declared_length_longer_than_digest() {
        let mut bytes = vec![0x12, 0x20];
        bytes.extend_from_slice(&[0xab; 16]);
        let err = EncodedIdentifier::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let text = bs58::encode(&bytes).into_string();
        assert!(matches!(
            EncodedIdentifier::parse(&text),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = vec![0x12, 0x04];
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert!(matches!(
            EncodedIdentifier::from_bytes(&bytes),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(matches!(
            EncodedIdentifier::parse(""),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_code() {
        // 0x7f is not a registered hash function
        let bytes = [0x7f, 0x02, 0xaa, 0xbb];
        assert_eq!(
            EncodedIdentifier::from_bytes(&bytes),
            Err(DecodeError::UnknownCode(0x7f))
        );
    }

    #[test]
    fn test_accepts_other_hash_families() {
        for code in [0x11, 0x16, 0x1b, 0x1e, 0x56, 0x1012, 0x534d, 0xb220, 0xb260, 0xb3e0] {
            let mh = Multihash::<MAX_DIGEST_SIZE>::wrap(code, &[0x5a; 32]).unwrap();
            let text = bs58::encode(mh.to_bytes()).into_string();
            let id = EncodedIdentifier::parse(&text).unwrap();
            assert_eq!(id.code(), code);
            assert_eq!(id.digest(), &[0x5a; 32]);
        }
    }

    #[test]
    fn test_rejects_codes_outside_ranged_families() {
        for code in [0x10, 0x20, 0xb200, 0xb261, 0xb3e1] {
            let mh = Multihash::<MAX_DIGEST_SIZE>::wrap(code, &[1, 2, 3, 4]).unwrap();
            assert_eq!(
                EncodedIdentifier::from_bytes(&mh.to_bytes()),
                Err(DecodeError::UnknownCode(code))
            );
        }
    }

    #[test]
    fn test_hash_function_names() {
        assert_eq!(hash_function_name(SHA2_256), Some("sha2-256"));
        assert_eq!(hash_function_name(0x16), Some("sha3-256"));
        assert_eq!(hash_function_name(0xb220), Some("blake2b"));
        assert_eq!(hash_function_name(0x05), Some("app-specific"));
        assert_eq!(hash_function_name(0x7f), None);
    }

    #[test]
    fn test_ed25519_public_key_from_identity_peer_id() {
        let mut digest = ED25519_KEY_HEADER.to_vec();
        digest.extend_from_slice(&[9; 32]);
        let mh = Multihash::<MAX_DIGEST_SIZE>::wrap(IDENTITY, &digest).unwrap();
        let id = EncodedIdentifier::from_multihash(mh).unwrap();
        assert!(id.to_base58().starts_with("12D3KooW"));
        assert_eq!(id.ed25519_public_key(), Some([9; 32]));

        // hashed peer IDs carry no key
        let hashed = EncodedIdentifier::parse(PEER_ID).unwrap();
        assert_eq!(hashed.ed25519_public_key(), None);

        // secp256k1 header
        let mut digest = vec![0x08, 0x02, 0x12, 0x21];
        digest.extend_from_slice(&[2; 33]);
        let mh = Multihash::<MAX_DIGEST_SIZE>::wrap(IDENTITY, &digest).unwrap();
        let id = EncodedIdentifier::from_multihash(mh).unwrap();
        assert_eq!(id.ed25519_public_key(), None);
    }

    #[test]
    fn test_accepts_identity_code() {
        let bytes = [IDENTITY as u8, 0x03, 1, 2, 3];
        let id = EncodedIdentifier::from_bytes(&bytes).unwrap();
        assert_eq!(id.code(), IDENTITY);
        assert_eq!(id.digest(), &[1, 2, 3]);
        assert_eq!(id.to_bytes(), bytes.to_vec());
    }
}
