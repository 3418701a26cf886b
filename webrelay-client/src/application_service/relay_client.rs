//! Relay client - connect, authenticate, listen, reconnect.
//!
//! The client runs as a single supervisor task. Callers drive it through a
//! command channel ([`RelayClientHandle`]) and observe it through an event
//! channel of [`ClientEvent`]s. No state is shared with the caller.

use crate::application_service::connection::{ConnectionContext, ConnectionState};
use crate::domain::key_deriver;
use crate::domain::messages::{AuthMessage, ClientMessage, ServerMessage};
use crate::domain::session::UserId;
use crate::infrastructure::config::{DEFAULT_PEER_ID, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_RELAY_URL};
use crate::application_service::peer_message::seal_for_peer;
use crate::port::peer_encryption::PeerEncryption;
use crate::port::relay_transport::{RelayConnection, RelayTransport};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the event channel handed to the caller.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Configuration for the relay client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayClientConfig {
    /// Relay WebSocket URL.
    pub url: String,
    /// Base58 peer identifier the subscription key is derived from.
    pub peer_id: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed connections tolerated before giving up.
    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            peer_id: DEFAULT_PEER_ID.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: None,
        }
    }
}

/// Events emitted by the supervisor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    StateChanged(ConnectionState),
    /// The auth message went out with this subscription key.
    AuthSent { subscription_key: String },
    Message(ServerMessage),
    /// A connection attempt failed or an open connection errored.
    ConnectionFailed(String),
    /// The loop stopped and will not reconnect.
    Fatal(String),
}

/// Commands accepted by the supervisor loop.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    Send(ClientMessage),
    Shutdown,
}

/// Handle to a spawned relay client.
pub struct RelayClientHandle {
    command_tx: mpsc::Sender<ClientCommand>,
    task: JoinHandle<Result<()>>,
}

impl RelayClientHandle {
    /// Send a message on the current connection.
    ///
    /// Messages issued while disconnected are dropped.
    pub async fn send(&self, message: ClientMessage) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Send(message))
            .await
            .map_err(|_| anyhow::anyhow!("Relay client has stopped"))
    }

    /// Acknowledge a stored message so the relay stops replaying it.
    pub async fn ack(&self, message_id: impl Into<String>) -> Result<()> {
        self.send(ClientMessage::ack(message_id)).await
    }

    /// Seal `plaintext` for `recipient` and hand it to the relay, which
    /// stores it until the recipient comes online.
    pub async fn send_to_peer<E>(&self, encryption: &E, recipient: &str, plaintext: &[u8]) -> Result<()>
    where
        E: PeerEncryption + ?Sized,
    {
        let message = seal_for_peer(encryption, recipient, plaintext)?;
        self.send(ClientMessage::EncryptedMessage(message)).await
    }

    /// Ask the loop to close the connection and stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(ClientCommand::Shutdown)
            .await
            .map_err(|_| anyhow::anyhow!("Relay client has stopped"))
    }

    /// Wait for the loop to finish and return its result.
    pub async fn join(self) -> Result<()> {
        self.task.await.context("Relay client task panicked")?
    }
}

/// How a single connection ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Disconnected,
    Shutdown,
}

enum SessionError {
    /// Worth reconnecting.
    Failed(anyhow::Error),
    /// Reconnecting would fail the same way.
    Fatal(anyhow::Error),
}

/// Supervisor for relay connections.
pub struct RelayClient<T: RelayTransport> {
    transport: Arc<T>,
    config: RelayClientConfig,
}

impl<T: RelayTransport + 'static> RelayClient<T> {
    pub fn new(transport: Arc<T>, config: RelayClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &RelayClientConfig {
        &self.config
    }

    /// Spawn the supervisor loop on the tokio runtime with a fresh user ID.
    pub fn spawn(self) -> (RelayClientHandle, mpsc::Receiver<ClientEvent>) {
        let context = ConnectionContext::new(
            self.config.url.clone(),
            self.config.peer_id.clone(),
            UserId::random(),
        );
        self.spawn_with_context(context)
    }

    /// Spawn the supervisor loop with a caller-provided context.
    pub fn spawn_with_context(
        self,
        mut context: ConnectionContext,
    ) -> (RelayClientHandle, mpsc::Receiver<ClientEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move { self.run(&mut context, command_rx, event_tx).await });

        (RelayClientHandle { command_tx, task }, event_rx)
    }

    /// Run the supervisor loop until shutdown or a fatal error.
    pub async fn run(
        &self,
        context: &mut ConnectionContext,
        mut commands: mpsc::Receiver<ClientCommand>,
        events: mpsc::Sender<ClientEvent>,
    ) -> Result<()> {
        info!(
            "Starting relay client for user {} against {}",
            context.user_id(),
            context.url()
        );

        loop {
            context.begin_connect()?;
            emit(&events, ClientEvent::StateChanged(ConnectionState::Connecting));

            match self.run_session(context, &mut commands, &events).await {
                Ok(SessionEnd::Shutdown) => {
                    context.mark_closed(false)?;
                    emit(&events, ClientEvent::StateChanged(ConnectionState::Closed));
                    info!("Relay client shut down");
                    return Ok(());
                }
                Ok(SessionEnd::Disconnected) => {
                    context.mark_closed(false)?;
                    info!("Relay connection to {} closed", context.url());
                }
                Err(SessionError::Failed(e)) => {
                    warn!(
                        "Relay connection attempt {} to {} failed: {:#}",
                        context.attempts(),
                        context.url(),
                        e
                    );
                    context.mark_closed(true)?;
                    emit(&events, ClientEvent::ConnectionFailed(format!("{:#}", e)));
                }
                Err(SessionError::Fatal(e)) => {
                    error!("Relay client stopping: {:#}", e);
                    context.mark_closed(true)?;
                    emit(&events, ClientEvent::StateChanged(ConnectionState::Closed));
                    emit(&events, ClientEvent::Fatal(format!("{:#}", e)));
                    return Err(e);
                }
            }

            emit(&events, ClientEvent::StateChanged(ConnectionState::Closed));

            if let Some(max) = self.config.max_reconnect_attempts {
                if context.consecutive_failures() > max {
                    let reason = format!(
                        "giving up after {} consecutive failed connections",
                        context.consecutive_failures()
                    );
                    error!("Relay client stopping: {}", reason);
                    emit(&events, ClientEvent::Fatal(reason.clone()));
                    anyhow::bail!(reason);
                }
            }

            debug!("Reconnecting in {:?}", self.config.reconnect_delay);
            if !wait_for_reconnect(self.config.reconnect_delay, &mut commands).await {
                info!("Relay client shut down while disconnected");
                return Ok(());
            }
        }
    }

    /// One connection: connect, derive, authenticate, then pump frames and
    /// commands until either side ends it.
    async fn run_session(
        &self,
        context: &mut ConnectionContext,
        commands: &mut mpsc::Receiver<ClientCommand>,
        events: &mpsc::Sender<ClientEvent>,
    ) -> Result<SessionEnd, SessionError> {
        let mut conn = self
            .transport
            .connect(context.url())
            .await
            .map_err(SessionError::Failed)?;

        context
            .mark_open()
            .map_err(|e| SessionError::Fatal(e.into()))?;
        emit(events, ClientEvent::StateChanged(ConnectionState::Open));
        info!("Connected to relay {}", context.url());

        let auth = match key_deriver::derive(context.peer_id())
            .context("Failed to derive subscription key")
            .and_then(|token| {
                let message = AuthMessage::new(context.user_id(), &token);
                let json = message.to_json()?;
                Ok((json, message.subscription_key))
            }) {
            Ok(auth) => auth,
            Err(e) => {
                if let Err(close_err) = conn.close().await {
                    debug!("Failed to close relay connection: {:#}", close_err);
                }
                return Err(SessionError::Fatal(e));
            }
        };
        let (auth_json, subscription_key) = auth;

        conn.send_text(auth_json)
            .await
            .map_err(SessionError::Failed)?;
        info!("Sent auth message with subscription key {}", subscription_key);
        emit(events, ClientEvent::AuthSent { subscription_key });

        loop {
            tokio::select! {
                frame = conn.next_text() => match frame {
                    Some(Ok(text)) => {
                        debug!("Received relay frame ({} bytes)", text.len());
                        emit(events, ClientEvent::Message(ServerMessage::parse(&text)));
                    }
                    Some(Err(e)) => return Err(SessionError::Failed(e)),
                    None => return Ok(SessionEnd::Disconnected),
                },
                command = commands.recv() => match command {
                    Some(ClientCommand::Send(message)) => {
                        let text = match message.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("Dropping unserializable message: {}", e);
                                continue;
                            }
                        };
                        conn.send_text(text).await.map_err(SessionError::Failed)?;
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        if let Err(e) = conn.close().await {
                            warn!("Failed to close relay connection: {:#}", e);
                        }
                        return Ok(SessionEnd::Shutdown);
                    }
                },
            }
        }
    }
}

/// Sleep for the reconnect delay. Returns false if shutdown was requested
/// (or every handle dropped) in the meantime.
async fn wait_for_reconnect(delay: Duration, commands: &mut mpsc::Receiver<ClientCommand>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(ClientCommand::Send(_)) => warn!("Dropping message: relay is disconnected"),
                Some(ClientCommand::Shutdown) | None => return false,
            },
        }
    }
}

/// Hand an event to the caller without blocking the loop.
///
/// A caller that stops draining events must not keep the loop from seeing
/// `Shutdown`, so events that do not fit are dropped.
fn emit(events: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!("Event channel full, dropping relay client event {:?}", event);
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Event receiver dropped, discarding relay client event");
        }
    }
}
