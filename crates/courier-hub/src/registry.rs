//! Client registry.
//!
//! Maps client ids to their [`ClientRecord`]. The registry is a plain owned
//! map: it lives inside the hub event loop, which is the only code that can
//! reach it, so no locking is involved.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, instrument};

use crate::client::ClientRecord;
use crate::connection::{ConnectionId, SendResult};
use crate::message::RosterEntry;

/// Outcome of delivering one frame to several clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Clients the frame was queued for
    pub delivered: usize,
    /// Clients whose queue was full or closed
    pub failed: usize,
}

/// Registry of registered clients keyed by client id.
///
/// Iteration (and therefore roster order) is sorted by id.
#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, ClientRecord>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record registered under the same id.
    ///
    /// Returns the displaced record, if any.
    #[instrument(skip(self, record), fields(client_id = %record.id()))]
    pub fn insert(&mut self, record: ClientRecord) -> Option<ClientRecord> {
        let existing = self.clients.insert(record.id().to_string(), record);
        if existing.is_some() {
            debug!("Replaced existing client registration");
        } else {
            debug!("Registered new client");
        }
        existing
    }

    /// Remove the record for `id`, but only if it still owns `connection`.
    ///
    /// A reader task whose record was displaced by a newer registration with
    /// the same id must not remove its successor.
    #[instrument(skip(self), fields(client_id = %id, connection = %connection))]
    pub fn remove(&mut self, id: &str, connection: ConnectionId) -> Option<ClientRecord> {
        match self.clients.get(id) {
            Some(record) if record.connection_id() == connection => self.clients.remove(id),
            Some(_) => {
                debug!("Client id now belongs to a newer connection");
                None
            }
            None => {
                debug!("Client was not registered");
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ClientRecord> {
        self.clients.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Registered ids in iteration order.
    pub fn ids(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// Queue a frame for one client.
    pub fn send_to(&self, id: &str, frame: String) -> SendResult {
        match self.clients.get(id) {
            Some(record) => record.send_frame(frame),
            None => {
                debug!(to = %id, "Recipient not connected");
                SendResult::NotConnected
            }
        }
    }

    /// Queue a frame for every client except `except`.
    pub fn send_to_all_except(&self, frame: &str, except: Option<&str>) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for (id, record) in &self.clients {
            if Some(id.as_str()) == except {
                continue;
            }
            if record.send_frame(frame.to_owned()).is_sent() {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }

    /// Queue a frame for every client.
    pub fn send_to_all(&self, frame: &str) -> DeliveryReport {
        self.send_to_all_except(frame, None)
    }

    /// Snapshot of every client's public identity.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.clients.values().map(ClientRecord::roster_entry).collect()
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("client_count", &self.clients.len())
            .finish()
    }
}
