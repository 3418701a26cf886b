//! Connection state owned by the caller of the relay client.

use crate::domain::session::UserId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid connection transition: {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// Everything a session needs across reconnects.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    url: String,
    peer_id: String,
    user_id: UserId,
    state: ConnectionState,
    attempts: u64,
    consecutive_failures: u32,
}

impl ConnectionContext {
    pub fn new(url: impl Into<String>, peer_id: impl Into<String>, user_id: UserId) -> Self {
        Self {
            url: url.into(),
            peer_id: peer_id.into(),
            user_id,
            state: ConnectionState::Closed,
            attempts: 0,
            consecutive_failures: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Total number of connection attempts so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Failed connections since the last one that opened cleanly.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Closed -> Connecting.
    pub fn begin_connect(&mut self) -> Result<(), ConnectionError> {
        self.transition(ConnectionState::Closed, ConnectionState::Connecting)?;
        self.attempts += 1;
        Ok(())
    }

    /// Connecting -> Open.
    pub fn mark_open(&mut self) -> Result<(), ConnectionError> {
        self.transition(ConnectionState::Connecting, ConnectionState::Open)?;
        self.consecutive_failures = 0;
        Ok(())
    }

    /// Connecting | Open -> Closed.
    ///
    /// A connection that never opened, or that ended with an error, counts
    /// towards the consecutive failure limit.
    pub fn mark_closed(&mut self, failed: bool) -> Result<(), ConnectionError> {
        let from = self.state;
        if from == ConnectionState::Closed {
            return Err(ConnectionError::InvalidTransition {
                from,
                to: ConnectionState::Closed,
            });
        }
        self.state = ConnectionState::Closed;
        if failed || from == ConnectionState::Connecting {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
        Ok(())
    }

    fn transition(
        &mut self,
        expected: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), ConnectionError> {
        if self.state != expected {
            return Err(ConnectionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
