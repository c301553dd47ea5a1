//! The hub's view of one registered party.

use courier_crypto::KeyPair;

use crate::connection::{Connection, ConnectionId, SendResult};
use crate::message::{MessageKind, RosterEntry, RoutedMessage};

/// A registered client.
///
/// Owns its [`Connection`] exclusively; dropping or closing the record
/// closes the connection.
#[derive(Debug)]
pub struct ClientRecord {
    id: String,
    display_name: String,
    /// Key declared by the client at registration. This is the roster key.
    public_key: String,
    /// Key pair generated by the server for this connection during the handshake.
    server_keys: Option<KeyPair>,
    connection: Connection,
}

impl ClientRecord {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        public_key: impl Into<String>,
        connection: Connection,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            public_key: public_key.into(),
            server_keys: None,
            connection,
        }
    }

    /// Build a record from a `register` frame.
    ///
    /// `from` becomes the id, `content` the display name and `publicKey` the
    /// declared key. Missing fields become empty strings; ids are taken as
    /// declared. Returns `None` for any other kind.
    pub fn from_registration(message: &RoutedMessage, connection: Connection) -> Option<Self> {
        if message.kind != MessageKind::Register {
            return None;
        }

        Some(Self::new(
            message.from.clone().unwrap_or_default(),
            message.content.clone().unwrap_or_default(),
            message.public_key.clone().unwrap_or_default(),
            connection,
        ))
    }

    /// Attach the per-connection server key pair.
    pub fn with_server_keys(mut self, keys: KeyPair) -> Self {
        self.server_keys = Some(keys);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn server_keys(&self) -> Option<&KeyPair> {
        self.server_keys.as_ref()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Queue a text frame on this client's connection.
    pub fn send_frame(&self, frame: String) -> SendResult {
        self.connection.send_frame(frame)
    }

    /// This client's roster line.
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            id: self.id.clone(),
            username: self.display_name.clone(),
            public_key: self.public_key.clone(),
        }
    }

    /// Drop the record and close its connection.
    pub fn close(self) {
        self.connection.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_registration() {
        let (conn, _rx) = Connection::channel(4);
        let conn_id = conn.id();
        let msg = RoutedMessage::register("u1", "alice", "PEM");

        let record = ClientRecord::from_registration(&msg, conn).unwrap();

        assert_eq!(record.id(), "u1");
        assert_eq!(record.display_name(), "alice");
        assert_eq!(record.public_key(), "PEM");
        assert_eq!(record.connection_id(), conn_id);
        assert!(record.server_keys().is_none());
    }

    #[test]
    fn test_registration_without_key_or_name() {
        let (conn, _rx) = Connection::channel(4);
        let msg = RoutedMessage::new(MessageKind::Register).with_from("u1");

        let record = ClientRecord::from_registration(&msg, conn).unwrap();
        assert_eq!(record.display_name(), "");
        assert_eq!(record.public_key(), "");
    }

    #[test]
    fn test_from_registration_rejects_other_kinds() {
        let (conn, _rx) = Connection::channel(4);
        let msg = RoutedMessage::chat("u1", "u2", "hi");
        assert!(ClientRecord::from_registration(&msg, conn).is_none());
    }

    #[test]
    fn test_from_registration_accepts_missing_or_empty_id() {
        let (conn, _rx) = Connection::channel(4);
        let missing = RoutedMessage::new(MessageKind::Register)
            .with_content("alice")
            .with_public_key("PEM");
        let record = ClientRecord::from_registration(&missing, conn).unwrap();
        assert_eq!(record.id(), "");
        assert_eq!(record.display_name(), "alice");

        let (conn, _rx) = Connection::channel(4);
        let empty = RoutedMessage::register("", "bob", "PEM");
        let record = ClientRecord::from_registration(&empty, conn).unwrap();
        assert_eq!(record.id(), "");
        assert_eq!(record.display_name(), "bob");
    }

    #[test]
    fn test_roster_entry_uses_declared_key() {
        let (conn, _rx) = Connection::channel(4);
        let record = ClientRecord::new("u1", "alice", "CLIENT-PEM", conn);

        assert_eq!(
            record.roster_entry(),
            RosterEntry {
                id: "u1".into(),
                username: "alice".into(),
                public_key: "CLIENT-PEM".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_close_ends_outbound_queue() {
        let (conn, mut rx) = Connection::channel(4);
        let record = ClientRecord::new("u1", "alice", "PEM", conn);

        record.close();
        assert!(rx.recv().await.is_none());
    }
}
