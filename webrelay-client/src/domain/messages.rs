//! Wire messages exchanged with the relay.

use super::identifier::{DecodeError, EncodedIdentifier};
use super::key_deriver::SubscriptionToken;
use super::session::UserId;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid message payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid recipient {recipient}: {source}")]
    InvalidRecipient {
        recipient: String,
        #[source]
        source: DecodeError,
    },
}

/// First message sent on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMessage {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "subscriptionKey")]
    pub subscription_key: String,
}

impl AuthMessage {
    pub fn new(user_id: &UserId, token: &SubscriptionToken) -> Self {
        Self {
            user_id: user_id.to_string(),
            subscription_key: token.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// An opaque ciphertext stored and forwarded by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    pub id: String,
    #[serde(rename = "encryptedMessage")]
    pub message: String,
    #[serde(default)]
    pub recipient: String,
}

impl EncryptedMessage {
    /// Build an outgoing message for `recipient` from raw ciphertext.
    ///
    /// The recipient must be a decodable peer identifier; the relay derives
    /// the storage topic from it.
    pub fn for_recipient(recipient: &str, ciphertext: &[u8]) -> Result<Self, MessageError> {
        EncodedIdentifier::parse(recipient).map_err(|source| MessageError::InvalidRecipient {
            recipient: recipient.to_string(),
            source,
        })?;
        Ok(Self {
            id: String::new(),
            message: STANDARD.encode(ciphertext),
            recipient: recipient.to_string(),
        })
    }

    /// Decode the base64 ciphertext.
    pub fn decode_payload(&self) -> Result<Vec<u8>, MessageError> {
        STANDARD
            .decode(self.message.trim())
            .map_err(|e| MessageError::InvalidPayload(e.to_string()))
    }
}

/// Marks a stored message as read for this user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "messageID")]
    pub message_id: String,
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Auth(bool),
    Error(String),
    Encrypted(EncryptedMessage),
    Unrecognized(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawServerMessage {
    Auth { auth: bool },
    Error { error: String },
    Encrypted(EncryptedMessage),
}

impl ServerMessage {
    /// Classify a text frame by shape. Never fails.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<RawServerMessage>(text) {
            Ok(RawServerMessage::Auth { auth }) => ServerMessage::Auth(auth),
            Ok(RawServerMessage::Error { error }) => ServerMessage::Error(error),
            Ok(RawServerMessage::Encrypted(message)) => ServerMessage::Encrypted(message),
            Err(_) => ServerMessage::Unrecognized(text.to_string()),
        }
    }
}

/// Typed envelope for messages sent after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "Type", content = "Data")]
pub enum ClientMessage {
    AckMessage(AckMessage),
    EncryptedMessage(EncryptedMessage),
}

impl ClientMessage {
    pub fn ack(message_id: impl Into<String>) -> Self {
        ClientMessage::AckMessage(AckMessage {
            message_id: message_id.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}
