// Event names and payloads exchanged with the chat transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::timestamp::Timestamp;
use crate::types::Message;

/// Inbound events, including the transport lifecycle signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Transport (re)connected.
    Connect,
    /// Transport lost its connection.
    Disconnect,
    /// A single live message.
    ReceiveMessage(Message),
    /// Latest history, oldest first. Replaces the whole transcript.
    ChatHistory(Vec<Message>),
    /// A page of older history, oldest first.
    OlderMessages(Vec<Message>),
    /// Informational sync status from the server.
    SyncStatus(SyncStatus),
}

impl ServerEvent {
    pub const CONNECT: &'static str = "connect";
    pub const DISCONNECT: &'static str = "disconnect";
    pub const RECEIVE_MESSAGE: &'static str = "receive_message";
    pub const CHAT_HISTORY: &'static str = "chat_history";
    pub const OLDER_MESSAGES: &'static str = "older_messages";
    pub const SYNC_STATUS: &'static str = "sync_status";

    /// Decode an `(event name, payload)` pair as delivered by an
    /// event-emitter transport. A `null` batch payload decodes as empty.
    pub fn from_named(name: &str, payload: Value) -> Result<Self, ProtocolError> {
        match name {
            Self::CONNECT => Ok(Self::Connect),
            Self::DISCONNECT => Ok(Self::Disconnect),
            Self::RECEIVE_MESSAGE => decode(name, payload).map(Self::ReceiveMessage),
            Self::CHAT_HISTORY => decode_batch(name, payload).map(Self::ChatHistory),
            Self::OLDER_MESSAGES => decode_batch(name, payload).map(Self::OlderMessages),
            Self::SYNC_STATUS => decode(name, payload).map(Self::SyncStatus),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect => Self::CONNECT,
            Self::Disconnect => Self::DISCONNECT,
            Self::ReceiveMessage(_) => Self::RECEIVE_MESSAGE,
            Self::ChatHistory(_) => Self::CHAT_HISTORY,
            Self::OlderMessages(_) => Self::OLDER_MESSAGES,
            Self::SyncStatus(_) => Self::SYNC_STATUS,
        }
    }
}

/// Payload of a `sync_status` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub status: String,
}

/// Outbound requests to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Post a new message (already trimmed, never empty).
    SendMessage(String),
    /// Ask for a page of history strictly older than a cursor.
    LoadOlderMessages(LoadOlderRequest),
    /// Ask for the latest history, replacing the transcript.
    RefreshChat(RefreshRequest),
    /// Liveness nudge; carries no payload.
    CheckNewMessages,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "send_message",
            Self::LoadOlderMessages(_) => "load_older_messages",
            Self::RefreshChat(_) => "refresh_chat",
            Self::CheckNewMessages => "check_new_messages",
        }
    }

    /// Payload for an event-emitter transport; `Null` when there is none.
    pub fn payload(&self) -> Result<Value, ProtocolError> {
        let encoded = match self {
            Self::SendMessage(text) => Ok(Value::String(text.clone())),
            Self::LoadOlderMessages(request) => serde_json::to_value(request),
            Self::RefreshChat(request) => serde_json::to_value(request),
            Self::CheckNewMessages => Ok(Value::Null),
        };
        encoded.map_err(|source| ProtocolError::Encode { event: self.name(), source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOlderRequest {
    pub before_timestamp: Timestamp,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub limit: usize,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("malformed `{event}` payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode `{event}` payload: {source}")]
    Encode {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn decode<T: serde::de::DeserializeOwned>(name: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload)
        .map_err(|source| ProtocolError::MalformedPayload { event: name.to_string(), source })
}

fn decode_batch(name: &str, payload: Value) -> Result<Vec<Message>, ProtocolError> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    decode(name, payload)
}
