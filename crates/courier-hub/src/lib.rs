//! # courier-hub
//!
//! The connection hub at the centre of the Courier relay.
//!
//! ## Architecture
//!
//! - **Hub event loop**: a single task owns the [`ClientRegistry`] and is the
//!   only place it is mutated. Admissions, evictions and routing requests
//!   arrive as [`HubEvent`]s on one ordered queue.
//! - **Connections**: each live socket is represented by a [`Connection`],
//!   the sending half of a bounded outbound queue drained by a per-socket
//!   writer task. The hub only ever enqueues, so a slow peer cannot stall it.
//! - **Routing**: `chat` and `keyExchange` frames go to the client named in
//!   `to`, `broadcast` frames go to everyone but the sender, and every
//!   admission or eviction republishes the roster.
//!
//! ```text
//! reader task (u1) ──┐                          ┌──> outbound queue ──> writer task (u1)
//! reader task (u2) ──┼──> HubEvent queue ──> Hub ┼──> outbound queue ──> writer task (u2)
//! session (u3)     ──┘                          └──> outbound queue ──> writer task (u3)
//! ```
//!
//! The hub never looks inside `content`; it is a relay for whatever the
//! peers encrypted with keys they exchanged through it.

pub mod client;
pub mod connection;
pub mod hub;
pub mod message;
pub mod registry;
pub mod routing;

mod error;

pub use client::ClientRecord;
pub use connection::{Connection, ConnectionId, SendResult};
pub use error::{FrameError, HubError};
pub use hub::{Hub, HubConfig, HubEvent, HubHandle};
pub use message::{MessageKind, RosterEntry, RosterFrame, RoutedMessage, WELCOME_GREETING};
pub use registry::ClientRegistry;
pub use routing::RoutingResult;
