//! Per-connection session.
//!
//! ```text
//! Upgrading ──> AwaitingRegistration ──> Registered ──> Closed
//!                       │                                  ▲
//!                       └──────── bad first frame ─────────┘
//! ```
//!
//! After the upgrade the socket is split. The read half stays with the
//! session task, which performs the handshake and then runs the reader
//! loop. The write half goes to a writer task that drains the connection's
//! outbound queue; it is the only code that writes to the socket.

use axum::extract::ws::{Message, WebSocket};
use courier_crypto::{generate_key_pair_with_bits, CryptoError, KeyPair, DEFAULT_KEY_BITS};
use courier_hub::{ClientRecord, Connection, ConnectionId, HubHandle, RoutedMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::SessionError;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Frames buffered for a slow peer before further frames are dropped
    pub outbound_buffer: usize,
    /// Modulus size of the per-connection server key pair
    pub key_bits: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            key_bits: DEFAULT_KEY_BITS,
        }
    }
}

/// Drive one upgraded socket from handshake to close.
pub async fn run(socket: WebSocket, hub: HubHandle, settings: SessionSettings) {
    let (connection, outbound) = Connection::channel(settings.outbound_buffer);
    let connection_id = connection.id();

    async move {
        let (mut sink, mut stream) = socket.split();

        let record = match handshake(&mut stream, connection, &settings).await {
            Ok(record) => record,
            Err(e) => {
                e.log();
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "Socket already closed");
                }
                return;
            }
        };

        tokio::spawn(write_frames(sink, outbound, connection_id).in_current_span());

        let client_id = record.id().to_string();
        info!(client_id = %client_id, username = %record.display_name(), "Registration accepted");

        if let Err(e) = hub.admit(record).await {
            SessionError::from(e).log();
            return;
        }

        read_frames(&mut stream, &hub).await;

        if hub.evict(client_id, connection_id).await.is_err() {
            debug!("Hub stopped before eviction");
        }
        debug!("Session closed");
    }
    .instrument(info_span!("session", connection = %connection_id))
    .await
}

/// Generate the server key pair, wait for the registration frame and queue
/// the `welcome` reply.
async fn handshake(
    stream: &mut SplitStream<WebSocket>,
    connection: Connection,
    settings: &SessionSettings,
) -> Result<ClientRecord, SessionError> {
    let keys = generate_server_keys(settings.key_bits).await?;
    let server_public_key = keys.public_key_pem()?;

    let message = next_registration_frame(stream).await?;
    let record = ClientRecord::from_registration(&message, connection)
        .ok_or_else(|| {
            SessionError::protocol(format!("expected register frame, got {:?}", message.kind))
        })?
        .with_server_keys(keys);

    let welcome = RoutedMessage::welcome(server_public_key).to_frame()?;
    if !record.send_frame(welcome).is_sent() {
        return Err(SessionError::protocol("could not queue welcome frame"));
    }

    Ok(record)
}

async fn generate_server_keys(bits: usize) -> Result<KeyPair, SessionError> {
    let keys = tokio::task::spawn_blocking(move || generate_key_pair_with_bits(bits))
        .await
        .map_err(|e| CryptoError::key_generation(format!("key generation task failed: {e}")))??;
    debug!(bits = keys.bits(), "Generated server key pair");
    Ok(keys)
}

/// Read until the first data frame and decode it.
async fn next_registration_frame(
    stream: &mut SplitStream<WebSocket>,
) -> Result<RoutedMessage, SessionError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(RoutedMessage::parse(&text)?),
            Some(Ok(Message::Binary(data))) => return Ok(RoutedMessage::from_slice(&data)?),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(SessionError::Closed),
            Some(Err(e)) => return Err(SessionError::Transport(e)),
        }
    }
}

/// Forward every decoded frame to the hub until the socket fails or closes.
///
/// Malformed frames are skipped; transport failures end the loop.
async fn read_frames(stream: &mut SplitStream<WebSocket>, hub: &HubHandle) {
    while let Some(result) = stream.next().await {
        let decoded = match result {
            Ok(Message::Text(text)) => RoutedMessage::parse(&text),
            Ok(Message::Binary(data)) => RoutedMessage::from_slice(&data),
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Peer closed connection");
                return;
            }
            Err(e) if is_abrupt_disconnect(&e) => {
                debug!(error = %e, "Peer went away without a close frame");
                return;
            }
            Err(e) => {
                warn!(error = %e, "WebSocket read error");
                return;
            }
        };

        match decoded {
            Ok(message) => {
                if hub.route(message).await.is_err() {
                    warn!("Hub stopped, ending session");
                    return;
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed frame"),
        }
    }
    debug!("WebSocket stream ended");
}

/// Whether a read error is a peer dropping the connection rather than a
/// protocol or I/O fault worth a warning.
fn is_abrupt_disconnect(error: &axum::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(e) = cause.downcast_ref::<WsError>() {
            return match e {
                WsError::ConnectionClosed | WsError::AlreadyClosed => true,
                WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
                WsError::Io(io) => is_disconnect_kind(io.kind()),
                _ => false,
            };
        }
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return is_disconnect_kind(io.kind());
        }
        source = cause.source();
    }
    false
}

fn is_disconnect_kind(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    matches!(kind, ConnectionReset | ConnectionAborted | BrokenPipe | UnexpectedEof)
}

/// Drain the outbound queue into the socket.
///
/// Ends when the owning [`ClientRecord`] is dropped by the hub or a write
/// fails, then closes the socket.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    connection: ConnectionId,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(frame)).await {
            warn!(connection = %connection, error = %e, "Failed to write frame");
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(connection = %connection, error = %e, "Socket already closed");
    }
    debug!(connection = %connection, "Writer stopped");
}
