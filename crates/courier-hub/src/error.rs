//! Error types for the hub.

use thiserror::Error;

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// The event loop has stopped and no longer accepts events
    #[error("Hub event loop is not running")]
    Closed,
}

/// A frame that could not be decoded into, or encoded from, a message.
#[derive(Debug, Error)]
#[error("Malformed frame: {0}")]
pub struct FrameError(#[from] serde_json::Error);
