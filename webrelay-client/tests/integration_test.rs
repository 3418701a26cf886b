//! Integration tests for the relay client.
//!
//! These tests run the client against a real WebSocket server on localhost
//! that speaks the relay's side of the protocol.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use webrelay_client::domain::messages::ServerMessage;
use webrelay_client::infrastructure::WebSocketTransport;
use webrelay_client::{derive, ClientEvent, ConnectionState, RelayClient, RelayClientConfig};

const PEER_ID: &str = "QmaSAmPPynrWfz1R8XvRm1GX6ghzPze6XSZCov6fWWUzSg";
const PEER_SUBSCRIPTION_KEY: &str = "QmaGLQjHHdeZ3wKtKqHS9etMwSUDnckHnAYS6eqvAgp2Hf";

async fn bind_relay() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn read_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return text,
            _ => continue,
        }
    }
}

fn client_config(url: &str) -> RelayClientConfig {
    RelayClientConfig {
        url: url.to_string(),
        peer_id: PEER_ID.to_string(),
        reconnect_delay: Duration::from_millis(50),
        max_reconnect_attempts: None,
    }
}

async fn next_event(rx: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[test]
fn test_derive_golden_value() {
    let token = derive(PEER_ID).unwrap();
    assert_eq!(token.to_string(), PEER_SUBSCRIPTION_KEY);
}

#[tokio::test]
async fn test_authenticate_and_receive() {
    let (listener, url) = bind_relay().await;
    let (ack_tx, ack_rx) = oneshot::channel();

    let relay = tokio::spawn(async move {
        let mut ws = accept(&listener).await;

        let auth: serde_json::Value = serde_json::from_str(&read_text(&mut ws).await).unwrap();
        ws.send(Message::Text(r#"{"auth": true}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Text(
            "{\n    \"id\": \"f00d\",\n    \"encryptedMessage\": \"c2VjcmV0\",\n    \"recipient\": \"\"\n}"
                .to_string(),
        ))
        .await
        .unwrap();

        let ack = read_text(&mut ws).await;
        ack_tx.send(ack).unwrap();

        while let Some(Ok(_)) = ws.next().await {}
        auth
    });

    let client = RelayClient::new(Arc::new(WebSocketTransport::new()), client_config(&url));
    let (handle, mut events) = client.spawn();

    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::StateChanged(ConnectionState::Connecting)
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::StateChanged(ConnectionState::Open)
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::AuthSent {
            subscription_key: PEER_SUBSCRIPTION_KEY.to_string()
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Message(ServerMessage::Auth(true))
    );
    let message_id = match next_event(&mut events).await {
        ClientEvent::Message(ServerMessage::Encrypted(message)) => {
            assert_eq!(message.decode_payload().unwrap(), b"secret");
            message.id
        }
        other => panic!("unexpected event: {:?}", other),
    };

    handle.ack(message_id).await.unwrap();
    let ack: serde_json::Value = serde_json::from_str(&ack_rx.await.unwrap()).unwrap();
    assert_eq!(ack["Type"], "AckMessage");
    assert_eq!(ack["Data"]["messageID"], "f00d");

    handle.shutdown().await.unwrap();
    handle.join().await.unwrap();

    let auth = relay.await.unwrap();
    assert_eq!(auth["subscriptionKey"], PEER_SUBSCRIPTION_KEY);
    assert!(!auth["userID"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_reconnect_after_relay_drop() {
    let (listener, url) = bind_relay().await;

    let relay = tokio::spawn(async move {
        // first connection: take the auth message, then drop without a close frame
        let mut first = accept(&listener).await;
        let first_auth = read_text(&mut first).await;
        drop(first);

        let mut second = accept(&listener).await;
        let second_auth = read_text(&mut second).await;
        second
            .send(Message::Text(r#"{"auth": true}"#.to_string()))
            .await
            .unwrap();
        while let Some(Ok(_)) = second.next().await {}

        (first_auth, second_auth)
    });

    let client = RelayClient::new(Arc::new(WebSocketTransport::new()), client_config(&url));
    let (handle, mut events) = client.spawn();

    let mut auth_sent = 0;
    let mut closed = 0;
    loop {
        match next_event(&mut events).await {
            ClientEvent::AuthSent { .. } => auth_sent += 1,
            ClientEvent::StateChanged(ConnectionState::Closed) => closed += 1,
            ClientEvent::Message(ServerMessage::Auth(true)) => break,
            _ => {}
        }
    }
    assert_eq!(auth_sent, 2);
    assert_eq!(closed, 1);

    handle.shutdown().await.unwrap();
    handle.join().await.unwrap();

    // same session identity on both connections
    let (first_auth, second_auth) = relay.await.unwrap();
    assert_eq!(first_auth, second_auth);
}

#[tokio::test]
async fn test_relay_error_is_surfaced() {
    let (listener, url) = bind_relay().await;

    let relay = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = read_text(&mut ws).await;
        ws.send(Message::Text(r#"{"error": "subscription key"}"#.to_string()))
            .await
            .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = RelayClient::new(Arc::new(WebSocketTransport::new()), client_config(&url));
    let (handle, mut events) = client.spawn();

    loop {
        if let ClientEvent::Message(message) = next_event(&mut events).await {
            assert_eq!(message, ServerMessage::Error("subscription key".to_string()));
            break;
        }
    }

    handle.shutdown().await.unwrap();
    handle.join().await.unwrap();
    relay.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_relay_gives_up() {
    let (listener, url) = bind_relay().await;
    drop(listener);

    let config = RelayClientConfig {
        max_reconnect_attempts: Some(1),
        ..client_config(&url)
    };
    let client = RelayClient::new(Arc::new(WebSocketTransport::new()), config);
    let (handle, mut events) = client.spawn();

    let mut failures = 0;
    loop {
        match next_event(&mut events).await {
            ClientEvent::ConnectionFailed(_) => failures += 1,
            ClientEvent::Fatal(_) => break,
            _ => {}
        }
    }
    assert_eq!(failures, 2);
    assert!(handle.join().await.is_err());
}
