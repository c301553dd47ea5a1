//! Hub event loop.
//!
//! The [`Hub`] owns the [`ClientRegistry`] and processes [`HubEvent`]s one
//! at a time. Sessions talk to it through a cloneable [`HubHandle`]. Events
//! submitted through one handle are processed in submission order; events
//! from different sessions are processed in arrival order.
//!
//! ## Usage
//!
//! ```ignore
//! let (hub, handle) = Hub::new(HubConfig::default());
//! tokio::spawn(hub.run());
//!
//! // After a successful handshake:
//! handle.admit(record).await?;
//!
//! // For every frame the reader task decodes:
//! handle.route(message).await?;
//!
//! // When the reader task exits:
//! handle.evict(client_id, connection_id).await?;
//! ```

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::client::ClientRecord;
use crate::connection::ConnectionId;
use crate::message::{RosterEntry, RoutedMessage};
use crate::registry::ClientRegistry;
use crate::routing::{self, RoutingResult};
use crate::HubError;

/// Default capacity of the hub's event queue.
pub const DEFAULT_EVENT_QUEUE: usize = 256;

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the event queue; sessions wait when it is full
    pub event_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_queue: DEFAULT_EVENT_QUEUE,
        }
    }
}

/// Events processed by the hub, in queue order.
#[derive(Debug)]
pub enum HubEvent {
    /// A handshake completed; add the client and republish the roster
    Admit(ClientRecord),
    /// A reader task exited; remove the client if it still owns `connection`
    Evict {
        id: String,
        connection: ConnectionId,
    },
    /// A decoded inbound frame
    Route(RoutedMessage),
    /// Request a copy of the current roster
    Roster(oneshot::Sender<Vec<RosterEntry>>),
}

/// The connection hub.
pub struct Hub {
    events: mpsc::Receiver<HubEvent>,
    registry: ClientRegistry,
}

impl Hub {
    /// Create a hub and the handle used to feed it.
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.event_queue.max(1));
        let hub = Self {
            events: rx,
            registry: ClientRegistry::new(),
        };
        (hub, HubHandle { events: tx })
    }

    /// Create a hub and run it on the current tokio runtime.
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (hub, handle) = Self::new(config);
        tokio::spawn(hub.run());
        handle
    }

    /// Process events until every [`HubHandle`] has been dropped.
    pub async fn run(mut self) {
        info!("Hub event loop started");

        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }

        info!(
            clients = self.registry.len(),
            "Hub event loop stopped, all handles dropped"
        );
    }

    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Admit(record) => self.admit(record),
            HubEvent::Evict { id, connection } => {
                self.evict(&id, connection);
            }
            HubEvent::Route(message) => {
                self.route(&message);
            }
            HubEvent::Roster(reply) => {
                if reply.send(self.registry.roster()).is_err() {
                    debug!("Roster requester went away");
                }
            }
        }
    }

    /// Add a client, replacing any client registered under the same id.
    ///
    /// Last write wins, but unlike a silent overwrite the replaced client is
    /// not left connected and unlisted: its record is dropped here, which
    /// closes its connection. Its reader task then exits and its own eviction
    /// is a no-op because the connection id no longer matches.
    #[instrument(skip(self, record), fields(client_id = %record.id(), connection = %record.connection_id()))]
    pub fn admit(&mut self, record: ClientRecord) {
        let username = record.display_name().to_string();

        if let Some(displaced) = self.registry.insert(record) {
            warn!(
                displaced_connection = %displaced.connection_id(),
                "Client id re-registered, closing previous connection"
            );
            displaced.close();
        }

        info!(username = %username, clients = self.registry.len(), "Client registered");
        self.publish_roster();
    }

    /// Remove a client if it is registered and still owns `connection`.
    ///
    /// Returns whether a client was removed. Evicting an absent client, or
    /// evicting the same client twice, is a no-op.
    #[instrument(skip(self), fields(client_id = %id, connection = %connection))]
    pub fn evict(&mut self, id: &str, connection: ConnectionId) -> bool {
        let Some(record) = self.registry.remove(id, connection) else {
            return false;
        };

        info!(
            username = %record.display_name(),
            clients = self.registry.len(),
            "Client unregistered"
        );
        record.close();
        self.publish_roster();
        true
    }

    /// Deliver a decoded frame according to its kind.
    #[instrument(skip(self, message), fields(kind = ?message.kind, from = ?message.from, to = ?message.to))]
    pub fn route(&self, message: &RoutedMessage) -> RoutingResult {
        let result = routing::route(&self.registry, message);
        debug!(?result, "Routed message");
        result
    }

    /// Send the current roster to every registered client.
    pub fn publish_roster(&self) -> usize {
        routing::publish_roster(&self.registry)
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle for submitting events to a running [`Hub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    pub async fn admit(&self, record: ClientRecord) -> Result<(), HubError> {
        self.send(HubEvent::Admit(record)).await
    }

    pub async fn evict(&self, id: impl Into<String>, connection: ConnectionId) -> Result<(), HubError> {
        self.send(HubEvent::Evict {
            id: id.into(),
            connection,
        })
        .await
    }

    pub async fn route(&self, message: RoutedMessage) -> Result<(), HubError> {
        self.send(HubEvent::Route(message)).await
    }

    /// Copy of the roster as of every event queued before this call.
    pub async fn roster(&self) -> Result<Vec<RosterEntry>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubEvent::Roster(tx)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Number of registered clients.
    pub async fn client_count(&self) -> Result<usize, HubError> {
        Ok(self.roster().await?.len())
    }

    /// Whether the event loop is still accepting events.
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.events.send(event).await.map_err(|_| HubError::Closed)
    }
}
