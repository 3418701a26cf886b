//! RelayTransport trait - Abstract interface for the relay socket

use anyhow::Result;
use async_trait::async_trait;

/// Opens connections to a relay.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    type Connection: RelayConnection;

    /// Connect to the relay at `url`.
    async fn connect(&self, url: &str) -> Result<Self::Connection>;
}

/// A single open relay connection carrying text frames.
#[async_trait]
pub trait RelayConnection: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Wait for the next text frame.
    ///
    /// Returns `None` once the relay has closed the connection cleanly.
    async fn next_text(&mut self) -> Option<Result<String>>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}
