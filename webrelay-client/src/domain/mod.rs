pub mod identifier;
pub mod key_deriver;
pub mod messages;
pub mod session;

pub use identifier::{DecodeError, EncodedIdentifier};
pub use key_deriver::{derive, SubscriptionToken};
pub use messages::{AckMessage, AuthMessage, ClientMessage, EncryptedMessage, MessageError, ServerMessage};
pub use session::UserId;
