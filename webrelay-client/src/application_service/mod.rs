pub mod connection;
pub mod peer_message;
pub mod relay_client;

pub use connection::{ConnectionContext, ConnectionError, ConnectionState};
pub use peer_message::{open_message, seal_for_peer};
pub use relay_client::{ClientCommand, ClientEvent, RelayClient, RelayClientConfig, RelayClientHandle};
