//! # courier-server
//!
//! HTTP and WebSocket front end for the Courier relay.
//!
//! - `GET /ws` upgrades to a WebSocket and runs a [`session`]: handshake,
//!   then a reader loop feeding the hub
//! - `GET /health` reports liveness and the number of registered clients
//! - everything else is served from the static directory

pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod telemetry;

pub use config::{Cli, ServerConfig};
pub use error::SessionError;
