//! Test utilities and mock implementations for unit testing.
//!
//! This module provides an in-memory relay transport so the supervisor loop
//! can be exercised without a real WebSocket server.

use crate::port::relay_transport::{RelayConnection, RelayTransport};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// MockRelayTransport
// ============================================================================

/// Type alias for sent messages storage, one list per connection.
pub type SentMessages = Arc<Mutex<Vec<Vec<String>>>>;

/// How a scripted session ends once its frames run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSessionEnd {
    /// The relay closes the connection cleanly.
    Close,
    /// The connection errors out.
    Error,
    /// The connection stays open until the client closes it.
    StayOpen,
}

#[derive(Debug, Clone)]
struct MockSession {
    frames: VecDeque<String>,
    end: MockSessionEnd,
}

/// Mock implementation of RelayTransport for testing.
///
/// Each `connect` consumes the next scripted session. Connecting with no
/// session left fails, as does every connect while `fail_connects` is set.
#[derive(Default)]
pub struct MockRelayTransport {
    sessions: Mutex<VecDeque<MockSession>>,
    sent: SentMessages,
    fail_connects: AtomicBool,
    connect_count: AtomicUsize,
}

impl MockRelayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a session that delivers `frames` and then closes.
    pub async fn push_session(&self, frames: Vec<String>) {
        self.push(frames, MockSessionEnd::Close).await;
    }

    /// Script a session that delivers `frames` and then errors.
    pub async fn push_failing_session(&self, frames: Vec<String>) {
        self.push(frames, MockSessionEnd::Error).await;
    }

    /// Script a session that stays open with no frames.
    pub async fn push_open_session(&self) {
        self.push(Vec::new(), MockSessionEnd::StayOpen).await;
    }

    async fn push(&self, frames: Vec<String>, end: MockSessionEnd) {
        self.sessions.lock().await.push_back(MockSession {
            frames: frames.into(),
            end,
        });
    }

    pub fn fail_connects(&self, fail: bool) {
        self.fail_connects.store(fail, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Text frames sent by the client, grouped per connection.
    pub async fn sent_messages(&self) -> Vec<Vec<String>> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl RelayTransport for MockRelayTransport {
    type Connection = MockRelayConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_connects.load(Ordering::SeqCst) {
            anyhow::bail!("Connection to {} refused", url);
        }

        let session = self
            .sessions
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("No relay listening at {}", url))?;

        let index = {
            let mut sent = self.sent.lock().await;
            sent.push(Vec::new());
            sent.len() - 1
        };

        Ok(MockRelayConnection {
            frames: session.frames,
            end: session.end,
            sent: self.sent.clone(),
            index,
            closed: false,
        })
    }
}

/// Connection handed out by [`MockRelayTransport`].
pub struct MockRelayConnection {
    frames: VecDeque<String>,
    end: MockSessionEnd,
    sent: SentMessages,
    index: usize,
    closed: bool,
}

#[async_trait]
impl RelayConnection for MockRelayConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed {
            anyhow::bail!("Connection closed");
        }
        let mut sent = self.sent.lock().await;
        if let Some(messages) = sent.get_mut(self.index) {
            messages.push(text);
        }
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String>> {
        if self.closed {
            return None;
        }
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        match self.end {
            MockSessionEnd::Close => None,
            MockSessionEnd::Error => Some(Err(anyhow::anyhow!("Connection reset by peer"))),
            MockSessionEnd::StayOpen => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
