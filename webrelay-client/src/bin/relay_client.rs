//! Relay client binary entry point.
//!
//! Derives subscription keys, seals messages for a peer, or connects to a
//! relay and prints what it sends.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use webrelay_client::domain::key_deriver;
use webrelay_client::application_service::seal_for_peer;
use webrelay_client::domain::messages::{ClientMessage, ServerMessage};
use webrelay_client::infrastructure::{ClientConfig, NaclBoxEncryption, WebSocketTransport};
use webrelay_client::{ClientEvent, RelayClient};

/// Relay client CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "relay-client")]
#[command(about = "Web relay client - subscription key derivation and relay connection")]
struct Args {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the subscription key and pubsub topic for a peer ID.
    Derive {
        /// Base58 peer identifier.
        peer_id: String,
    },
    /// Encrypt a message for an Ed25519 peer and print the relay envelope.
    Seal {
        /// Identity peer ID of the recipient (12D3KooW...).
        recipient: String,
        /// Message text.
        message: String,
    },
    /// Connect to a relay, authenticate and print incoming messages.
    Connect {
        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Relay WebSocket URL.
        #[arg(short, long)]
        url: Option<String>,

        /// Peer ID to derive the subscription key from.
        #[arg(short, long)]
        peer_id: Option<String>,

        /// Delay between reconnect attempts, in milliseconds.
        #[arg(long)]
        reconnect_delay_ms: Option<u64>,

        /// Give up after this many consecutive failed connections.
        #[arg(long)]
        max_reconnect_attempts: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    match args.command {
        Command::Derive { peer_id } => {
            let token = key_deriver::derive(&peer_id)
                .with_context(|| format!("Invalid peer ID {}", peer_id))?;
            println!("subscription key: {}", token);
            println!("topic:            {}", token.topic());
            Ok(())
        }
        Command::Seal { recipient, message } => {
            let sealed = seal_for_peer(&NaclBoxEncryption::new(), &recipient, message.as_bytes())?;
            println!("{}", ClientMessage::EncryptedMessage(sealed).to_json()?);
            Ok(())
        }
        Command::Connect {
            config,
            url,
            peer_id,
            reconnect_delay_ms,
            max_reconnect_attempts,
        } => {
            let mut client_config = match config {
                Some(path) => ClientConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {:?}", path))?,
                None => ClientConfig::default(),
            };
            if let Some(url) = url {
                client_config.url = url;
            }
            if let Some(peer_id) = peer_id {
                client_config.peer_id = peer_id;
            }
            if let Some(delay) = reconnect_delay_ms {
                client_config.reconnect_delay_ms = delay;
            }
            if max_reconnect_attempts.is_some() {
                client_config.max_reconnect_attempts = max_reconnect_attempts;
            }

            run_client(client_config).await
        }
    }
}

async fn run_client(config: ClientConfig) -> Result<()> {
    tracing::info!("Relay: {}", config.url);
    tracing::info!("Peer ID: {}", config.peer_id);

    let client = RelayClient::new(Arc::new(WebSocketTransport::new()), config.relay_client_config());
    let (handle, mut events) = client.spawn();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::Message(message)) => print_message(&message),
                Some(ClientEvent::AuthSent { subscription_key }) => {
                    tracing::info!("Authenticating with subscription key {}", subscription_key);
                }
                Some(ClientEvent::StateChanged(state)) => tracing::debug!("Connection {}", state),
                Some(ClientEvent::ConnectionFailed(reason)) => tracing::warn!("{}", reason),
                Some(ClientEvent::Fatal(_)) | None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                handle.shutdown().await?;
                break;
            }
        }
    }

    handle.join().await
}

fn print_message(message: &ServerMessage) {
    match message {
        ServerMessage::Auth(true) => println!("Message from server: authenticated"),
        ServerMessage::Auth(false) => println!("Message from server: authentication rejected"),
        ServerMessage::Error(error) => println!("Message from server: error: {}", error),
        ServerMessage::Encrypted(encrypted) => match encrypted.decode_payload() {
            Ok(payload) => println!(
                "Message from server: encrypted message {} ({} bytes)",
                encrypted.id,
                payload.len()
            ),
            Err(e) => println!("Message from server: encrypted message {} ({})", encrypted.id, e),
        },
        ServerMessage::Unrecognized(text) => println!("Message from server: {}", text),
    }
}
