//! Wire model: one JSON object per WebSocket text frame.

use serde::{Deserialize, Serialize};

use crate::FrameError;

/// Greeting carried in the `content` of every `welcome` frame.
pub const WELCOME_GREETING: &str = "Connected to server";

/// The `type` discriminator of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// First frame of a session, declares identity and public key
    Register,
    /// Directed message, usually ciphertext
    Chat,
    /// Directed key material (wrapped symmetric key or public key)
    KeyExchange,
    /// Message for every registered client except the sender
    Broadcast,
    /// Server greeting carrying the per-connection server key
    Welcome,
    /// Roster update
    UserList,
}

impl MessageKind {
    /// Whether frames of this kind are delivered to the single client named in `to`.
    pub fn is_directed(self) -> bool {
        matches!(self, MessageKind::Chat | MessageKind::KeyExchange)
    }
}

/// A routed message envelope.
///
/// The hub only reads `type`, `from` and `to`. Everything else is relayed
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedMessage {
    /// Frame type
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Sender client id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient client id (directed kinds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Opaque payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// PEM encoded public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Caller supplied, never validated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl RoutedMessage {
    /// Create an empty message of the given kind.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            from: None,
            to: None,
            content: None,
            public_key: None,
            timestamp: None,
        }
    }

    /// Create a `register` frame.
    pub fn register(
        id: impl Into<String>,
        display_name: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self::new(MessageKind::Register)
            .with_from(id)
            .with_content(display_name)
            .with_public_key(public_key)
    }

    /// Create the `welcome` frame sent once a registration is accepted.
    pub fn welcome(server_public_key: impl Into<String>) -> Self {
        Self::new(MessageKind::Welcome)
            .with_content(WELCOME_GREETING)
            .with_public_key(server_public_key)
    }

    /// Create a `chat` frame.
    pub fn chat(from: impl Into<String>, to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageKind::Chat)
            .with_from(from)
            .with_to(to)
            .with_content(content)
    }

    /// Create a `broadcast` frame.
    pub fn broadcast(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageKind::Broadcast)
            .with_from(from)
            .with_content(content)
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Decode a text frame.
    pub fn parse(frame: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Decode a binary frame holding the same JSON.
    pub fn from_slice(frame: &[u8]) -> Result<Self, FrameError> {
        Ok(serde_json::from_slice(frame)?)
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One roster line: a registered client's public identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub username: String,
    pub public_key: String,
}

/// The `userList` frame published to every client after admissions and evictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterFrame {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub users: Vec<RosterEntry>,
}

impl RosterFrame {
    pub fn new(users: Vec<RosterEntry>) -> Self {
        Self {
            kind: MessageKind::UserList,
            users,
        }
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_kind_wire_names() {
        let names: Vec<String> = [
            MessageKind::Register,
            MessageKind::Chat,
            MessageKind::KeyExchange,
            MessageKind::Broadcast,
            MessageKind::Welcome,
            MessageKind::UserList,
        ]
        .iter()
        .map(|k| serde_json::to_value(k).unwrap().as_str().unwrap().to_string())
        .collect();

        assert_eq!(
            names,
            ["register", "chat", "keyExchange", "broadcast", "welcome", "userList"]
        );
    }

    #[test]
    fn test_parse_register_frame() {
        let msg = RoutedMessage::parse(
            r#"{"type":"register","from":"u1","content":"alice","publicKey":"PEM"}"#,
        )
        .unwrap();

        assert_eq!(msg, RoutedMessage::register("u1", "alice", "PEM"));
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let msg =
            RoutedMessage::parse(r#"{"type":"chat","from":"a","to":"b","extra":42}"#).unwrap();
        assert_eq!(msg.kind, MessageKind::Chat);
        assert_eq!(msg.to.as_deref(), Some("b"));
        assert!(msg.content.is_none());
    }

    #[test]
    fn test_parse_accepts_null_optional_fields() {
        let msg = RoutedMessage::parse(r#"{"type":"broadcast","to":null,"timestamp":null}"#)
            .unwrap();
        assert_eq!(msg, RoutedMessage::new(MessageKind::Broadcast));
    }

    #[test]
    fn test_parse_rejects_missing_or_unknown_type() {
        assert!(RoutedMessage::parse(r#"{"from":"u1"}"#).is_err());
        assert!(RoutedMessage::parse(r#"{"type":"typing","from":"u1"}"#).is_err());
        assert!(RoutedMessage::parse("not json").is_err());
    }

    #[test]
    fn test_binary_frame_decodes_like_text() {
        let text = r#"{"type":"broadcast","from":"u1","content":"x"}"#;
        assert_eq!(
            RoutedMessage::from_slice(text.as_bytes()).unwrap(),
            RoutedMessage::parse(text).unwrap()
        );
    }

    #[test]
    fn test_welcome_frame_shape() {
        let frame = RoutedMessage::welcome("PEM").to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(
            value,
            json!({"type": "welcome", "content": "Connected to server", "publicKey": "PEM"})
        );
    }

    #[test]
    fn test_chat_frame_preserves_all_fields() {
        let msg = RoutedMessage::chat("u1", "u2", "ciphertext").with_timestamp("12:00");
        let reparsed = RoutedMessage::parse(&msg.to_frame().unwrap()).unwrap();
        assert_eq!(reparsed, msg);
    }

    #[test]
    fn test_roster_frame_shape() {
        let frame = RosterFrame::new(vec![RosterEntry {
            id: "u1".into(),
            username: "alice".into(),
            public_key: "PEM".into(),
        }])
        .to_frame()
        .unwrap();

        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "userList",
                "users": [{"id": "u1", "username": "alice", "publicKey": "PEM"}]
            })
        );
    }

    #[test]
    fn test_is_directed() {
        assert!(MessageKind::Chat.is_directed());
        assert!(MessageKind::KeyExchange.is_directed());
        assert!(!MessageKind::Broadcast.is_directed());
        assert!(!MessageKind::Register.is_directed());
    }
}
