// Core message types shared by every chatsync crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timestamp::Timestamp;

/// Stable identity of a message, used for duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Identity of a message without a server-assigned key:
    /// `sender + timestamp + text`, concatenated verbatim.
    pub fn derive(sender: &str, timestamp: &Timestamp, text: &str) -> Self {
        let mut key = String::with_capacity(sender.len() + timestamp.as_str().len() + text.len());
        key.push_str(sender);
        key.push_str(timestamp.as_str());
        key.push_str(text);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat message exactly as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub sender: String,
    #[serde(rename = "message", alias = "text")]
    pub text: String,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_timestamp: Option<Timestamp>,
    /// Server-assigned identity (the ledger hash).
    #[serde(default, rename = "hash", alias = "identity_key", skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<String>,
}

/// A validated message. Identity is resolved once, at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMessage", into = "WireMessage")]
pub struct Message {
    pub id: MessageId,
    pub sender: String,
    pub text: String,
    pub timestamp: Timestamp,
    pub display_timestamp: Option<Timestamp>,
}

impl Message {
    /// Build a message without a server-assigned key; identity is derived.
    pub fn new(sender: impl Into<String>, text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::from(WireMessage {
            sender: sender.into(),
            text: text.into(),
            timestamp,
            display_timestamp: None,
            identity_key: None,
        })
    }

    pub fn with_identity_key(mut self, key: impl Into<String>) -> Self {
        self.id = MessageId::new(key);
        self
    }

    pub fn with_display_timestamp(mut self, display: Timestamp) -> Self {
        self.display_timestamp = Some(display);
        self
    }

    /// Timestamp used for human display: the display override when present.
    pub fn shown_timestamp(&self) -> &Timestamp {
        self.display_timestamp.as_ref().unwrap_or(&self.timestamp)
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let id = match wire.identity_key.as_deref() {
            Some(key) if !key.is_empty() => MessageId::new(key),
            _ => MessageId::derive(&wire.sender, &wire.timestamp, &wire.text),
        };
        Self {
            id,
            sender: wire.sender,
            text: wire.text,
            timestamp: wire.timestamp,
            display_timestamp: wire.display_timestamp,
        }
    }
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        Self {
            sender: message.sender,
            text: message.text,
            timestamp: message.timestamp,
            display_timestamp: message.display_timestamp,
            identity_key: Some(message.id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_prefers_server_hash() {
        let message: Message = serde_json::from_value(json!({
            "sender": "alice",
            "message": "hi",
            "timestamp": "2024-01-01 10:00:00",
            "hash": "abc123"
        }))
        .expect("message should decode");
        assert_eq!(message.id.as_str(), "abc123");
    }

    #[test]
    fn identity_falls_back_to_composite_key() {
        let message: Message = serde_json::from_value(json!({
            "sender": "alice",
            "message": "hi",
            "timestamp": "2024-01-01 10:00:00"
        }))
        .expect("message should decode");
        assert_eq!(message.id.as_str(), "alice2024-01-01 10:00:00hi");
    }

    #[test]
    fn empty_hash_is_treated_as_absent() {
        let message: Message = serde_json::from_value(json!({
            "sender": "bob",
            "message": "yo",
            "timestamp": "2024-01-01 10:00:00",
            "hash": ""
        }))
        .expect("message should decode");
        assert_eq!(message.id, MessageId::derive("bob", &"2024-01-01 10:00:00".into(), "yo"));
    }

    #[test]
    fn accepts_identity_key_and_text_aliases() {
        let message: Message = serde_json::from_value(json!({
            "sender": "carol",
            "text": "hello",
            "timestamp": "2024-01-01T10:00:00Z",
            "identity_key": "k-1"
        }))
        .expect("aliases should decode");
        assert_eq!(message.text, "hello");
        assert_eq!(message.id.as_str(), "k-1");
    }

    #[test]
    fn missing_timestamp_decodes_as_unparsable() {
        let message: Message =
            serde_json::from_value(json!({ "sender": "dave", "message": "?" }))
                .expect("missing timestamp should decode");
        assert!(!message.timestamp.is_comparable());
        assert_eq!(message.id.as_str(), "dave?");
    }

    #[test]
    fn shown_timestamp_prefers_display_override() {
        let message = Message::new("erin", "x", "2024-01-01 10:00:00".into())
            .with_display_timestamp("2024-01-01 15:30:00".into());
        assert_eq!(message.shown_timestamp().as_str(), "2024-01-01 15:30:00");
    }

    #[test]
    fn encodes_identity_as_hash() {
        let message = Message::new("frank", "ok", "2024-01-01 10:00:00".into());
        let value = serde_json::to_value(&message).expect("encode");
        assert_eq!(value["hash"], json!("frank2024-01-01 10:00:00ok"));
        assert_eq!(value["message"], json!("ok"));
    }
}
