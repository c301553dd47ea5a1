//! Message routing.
//!
//! # Routing Logic
//!
//! - `chat`, `keyExchange`: delivered verbatim to the client named in `to`;
//!   silently dropped when that client is not registered
//! - `broadcast`: delivered verbatim to every client except the one named in
//!   `from`
//! - anything else: ignored
//!
//! Delivery failures are logged and counted, never reported to the sender.

use tracing::{debug, error, warn};

use crate::message::{RosterFrame, RoutedMessage};
use crate::registry::ClientRegistry;
use crate::SendResult;

/// Result of a routing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingResult {
    /// The frame was handed to recipients' outbound queues
    Delivered {
        /// Number of recipients the frame was queued for
        delivered_count: usize,
        /// Number of recipients whose queue was full or closed
        failed_count: usize,
    },
    /// Directed message for a client that is not registered
    RecipientNotConnected,
    /// Directed message without a `to` field
    NoDestination,
    /// The message kind is not routable
    Ignored,
    /// The message could not be encoded
    Failed {
        /// Error description
        reason: String,
    },
}

/// Route one message against the current registry.
pub fn route(registry: &ClientRegistry, message: &RoutedMessage) -> RoutingResult {
    if message.kind.is_directed() {
        route_directed(registry, message)
    } else if message.kind == crate::MessageKind::Broadcast {
        route_broadcast(registry, message)
    } else {
        debug!(kind = ?message.kind, "Ignoring non-routable message");
        RoutingResult::Ignored
    }
}

fn route_directed(registry: &ClientRegistry, message: &RoutedMessage) -> RoutingResult {
    let Some(to) = message.to.as_deref() else {
        debug!(kind = ?message.kind, "Directed message without recipient");
        return RoutingResult::NoDestination;
    };

    if !registry.contains(to) {
        return RoutingResult::RecipientNotConnected;
    }

    let frame = match message.to_frame() {
        Ok(frame) => frame,
        Err(e) => return encode_failed(e),
    };

    match registry.send_to(to, frame) {
        SendResult::Sent => RoutingResult::Delivered {
            delivered_count: 1,
            failed_count: 0,
        },
        SendResult::NotConnected => RoutingResult::RecipientNotConnected,
        result => {
            warn!(to = %to, ?result, "Directed delivery failed");
            RoutingResult::Delivered {
                delivered_count: 0,
                failed_count: 1,
            }
        }
    }
}

fn route_broadcast(registry: &ClientRegistry, message: &RoutedMessage) -> RoutingResult {
    let frame = match message.to_frame() {
        Ok(frame) => frame,
        Err(e) => return encode_failed(e),
    };

    let report = registry.send_to_all_except(&frame, message.from.as_deref());
    if report.failed > 0 {
        warn!(failed = report.failed, "Broadcast delivery failed for some clients");
    }

    RoutingResult::Delivered {
        delivered_count: report.delivered,
        failed_count: report.failed,
    }
}

/// Send the current roster to every registered client.
///
/// Returns the number of clients it was queued for.
pub fn publish_roster(registry: &ClientRegistry) -> usize {
    let frame = match RosterFrame::new(registry.roster()).to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "Failed to encode roster");
            return 0;
        }
    };

    let report = registry.send_to_all(&frame);
    if report.failed > 0 {
        warn!(failed = report.failed, "Roster delivery failed for some clients");
    }
    debug!(clients = registry.len(), delivered = report.delivered, "Published roster");

    report.delivered
}

fn encode_failed(e: crate::FrameError) -> RoutingResult {
    error!(error = %e, "Failed to encode message");
    RoutingResult::Failed {
        reason: e.to_string(),
    }
}
