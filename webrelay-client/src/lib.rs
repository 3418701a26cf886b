pub mod application_service;
pub mod domain;
pub mod infrastructure;
pub mod port;
pub mod test_utils;

pub use application_service::{ClientEvent, ConnectionState, RelayClient, RelayClientConfig, RelayClientHandle};
pub use domain::*;
pub use port::*;
