//! Session error types.

use courier_crypto::CryptoError;
use courier_hub::{FrameError, HubError};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Reasons a session ends before or during registration.
///
/// None of these affect other sessions; each is resolved by closing the
/// one connection it occurred on.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Read or write failure on the socket
    #[error("Transport error: {0}")]
    Transport(#[from] axum::Error),

    /// The peer went away before registering
    #[error("Connection closed before registration")]
    Closed,

    /// The first frame was not a valid registration
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The first frame could not be decoded
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Key generation or encoding failed
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The hub is no longer running
    #[error("Hub error: {0}")]
    Hub(#[from] HubError),
}

impl SessionError {
    /// Create a new protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Log at a level matching the error class.
    pub fn log(&self) {
        match self {
            Self::Transport(_) | Self::Closed => debug!(error = %self, "Session ended"),
            Self::Protocol(_) | Self::Frame(_) => warn!(error = %self, "Rejected connection"),
            Self::Crypto(_) | Self::Hub(_) => error!(error = %self, "Session aborted"),
        }
    }
}
