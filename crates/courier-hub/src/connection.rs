//! Outbound side of a live connection.
//!
//! A [`Connection`] is the sending half of a bounded queue of text frames.
//! The receiving half belongs to the socket's writer task, which is the only
//! code that ever writes to the socket. Dropping the `Connection` ends the
//! writer task, and the writer closes the socket on its way out. Ownership
//! therefore guarantees a connection is closed at most once.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies one accepted socket.
///
/// Client ids are chosen by peers and may collide; connection ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of attempting to send a frame to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Frame was queued for delivery
    Sent,
    /// The recipient is not currently registered
    NotConnected,
    /// The recipient's outbound queue is full (slow consumer)
    ChannelFull,
    /// The recipient's writer task has gone away
    ChannelClosed,
}

impl SendResult {
    pub fn is_sent(self) -> bool {
        matches!(self, SendResult::Sent)
    }
}

/// Sending half of a connection's outbound queue.
pub struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

impl Connection {
    /// Create a connection whose outbound queue holds up to `capacity` frames.
    ///
    /// The returned receiver must be drained by the writer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id: ConnectionId::new(),
            outbound,
        };
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text frame without waiting.
    pub fn send_frame(&self, frame: String) -> SendResult {
        match self.outbound.try_send(frame) {
            Ok(()) => SendResult::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(connection = %self.id, "Outbound queue full, dropping frame");
                SendResult::ChannelFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection = %self.id, "Outbound queue closed, writer has gone away");
                SendResult::ChannelClosed
            }
        }
    }

    /// Whether the writer task has already stopped.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Close the connection.
    ///
    /// Frames already queued are still flushed by the writer before it
    /// closes the socket.
    pub fn close(self) {
        debug!(connection = %self.id, "Closing connection");
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
