//! Port layer - Abstract interfaces for infrastructure dependencies
//!
//! The relay client only talks to the network through these traits, so the
//! supervisor loop can run against a real WebSocket or an in-memory mock.

pub mod peer_encryption;
pub mod relay_transport;

pub use peer_encryption::{PeerEncryption, PeerEncryptionError};
pub use relay_transport::{RelayConnection, RelayTransport};
