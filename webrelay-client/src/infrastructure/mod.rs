pub mod config;
pub mod nacl_box_encryption;
pub mod websocket_transport;

pub use config::{ClientConfig, ConfigError};
pub use nacl_box_encryption::NaclBoxEncryption;
pub use websocket_transport::{WebSocketConnection, WebSocketTransport};
