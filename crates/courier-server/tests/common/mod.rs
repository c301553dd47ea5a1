//! Test utilities for driving a live relay over real WebSockets.
//!
//! Provides a server bound to an ephemeral port and a thin client wrapper
//! with frame-level assertions.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use courier_hub::{Hub, HubConfig, HubHandle, RoutedMessage};
use courier_server::server::{create_router, AppState};
use courier_server::session::SessionSettings;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Default timeout for test operations.
///
/// Generous because concurrent handshakes share the blocking pool for key
/// generation, which is slow in debug builds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// How long a client must stay quiet to count as having received nothing.
pub const SILENCE: Duration = Duration::from_millis(300);

/// Smaller server keys keep the handshake fast in debug builds.
pub const TEST_KEY_BITS: usize = 1024;

/// A relay listening on 127.0.0.1 with an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: HubHandle,
}

impl TestServer {
    pub async fn start() -> Self {
        let hub = Hub::spawn(HubConfig::default());
        let settings = SessionSettings {
            outbound_buffer: 64,
            key_bits: TEST_KEY_BITS,
        };
        let state = Arc::new(AppState::new(hub.clone(), settings));
        let app = create_router(state, "./does-not-exist");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hub }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Poll the hub until exactly `count` clients are registered.
    ///
    /// A session queues its `welcome` before its admission reaches the hub,
    /// so a welcome alone does not mean the client is listed yet.
    pub async fn wait_for_clients(&self, count: usize) -> Vec<String> {
        timeout(DEFAULT_TIMEOUT, async {
            loop {
                let ids = self.client_ids().await;
                if ids.len() == count {
                    return ids;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("timed out waiting for clients to register")
    }

    /// Registered client ids, in roster order.
    pub async fn client_ids(&self) -> Vec<String> {
        self.hub
            .roster()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }
}

/// A WebSocket client connected to a [`TestServer`].
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(server: &TestServer) -> Self {
        let (ws, _response) = timeout(DEFAULT_TIMEOUT, connect_async(server.ws_url()))
            .await
            .expect("connect timed out")
            .expect("connect failed");
        Self { ws }
    }

    /// Connect and register, returning the client and its `welcome` frame.
    ///
    /// The roster published for the registration is left unread.
    pub async fn register(server: &TestServer, id: &str, username: &str) -> (Self, Value) {
        let mut client = Self::connect(server).await;
        client
            .send(&RoutedMessage::register(id, username, declared_key(id)))
            .await;

        let welcome = client.recv_json().await;
        assert_eq!(welcome["type"], "welcome", "expected welcome, got {welcome}");
        (client, welcome)
    }

    pub async fn send(&mut self, message: &RoutedMessage) {
        self.send_text(message.to_frame().unwrap()).await;
    }

    pub async fn send_text(&mut self, text: impl Into<String>) {
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) {
        self.ws.send(Message::Binary(data)).await.unwrap();
    }

    /// Next data frame, or `None` once the server has closed the socket.
    pub async fn next_frame(&mut self) -> Option<Message> {
        loop {
            let next = timeout(DEFAULT_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame");
            match next {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                Some(Ok(message)) => return Some(message),
            }
        }
    }

    pub async fn recv_json(&mut self) -> Value {
        match self.next_frame().await {
            Some(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Receive a `userList` frame and check its ids; returns its users.
    pub async fn expect_roster(&mut self, ids: &[&str]) -> Vec<Value> {
        let frame = self.recv_json().await;
        assert_eq!(frame["type"], "userList", "expected roster, got {frame}");

        let users = frame["users"].as_array().unwrap().clone();
        let got: Vec<&str> = users.iter().map(|u| u["id"].as_str().unwrap()).collect();
        assert_eq!(got, ids);
        users
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        let next = timeout(SILENCE, self.ws.next()).await;
        assert!(next.is_err(), "expected no frame, got {next:?}");
    }

    /// Assert the server closes the socket without sending data first.
    pub async fn expect_closed(&mut self) {
        if let Some(frame) = self.next_frame().await {
            panic!("expected close, got {frame:?}");
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// The public key a test client declares at registration.
pub fn declared_key(id: &str) -> String {
    format!("{id}-declared-key")
}
