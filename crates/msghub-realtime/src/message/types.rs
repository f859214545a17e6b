//! Message type definitions shared by inbound and outbound traffic.

use serde::{Deserialize, Serialize};

/// Kind of a hub message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Application data.
    Data,
    /// In-band bearer token; consumed by the authentication linker.
    Authentication,
    /// Acknowledgement.
    Ack,
    /// Topic subscription request.
    Subscribe,
    /// Topic unsubscription request.
    Unsubscribe,
}

impl MessageType {
    /// Whether messages of this kind may be fanned out to connections.
    pub fn is_deliverable(self) -> bool {
        !matches!(self, Self::Authentication)
    }
}

/// A message flowing through the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubMessage {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Coalescing key: a queued message with an equal hash is superseded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Originating connection, stamped by the hub on inbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Originating principal, stamped by the hub on inbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    /// Payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl HubMessage {
    /// Creates an empty message of the given kind.
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            topic: None,
            hash: None,
            session_id: None,
            principal: None,
            payload: serde_json::Value::Null,
        }
    }

    /// Creates a data message on `topic`.
    pub fn data(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: Some(topic.into()),
            payload,
            ..Self::new(MessageType::Data)
        }
    }

    /// Creates an authentication message carrying `token`.
    pub fn authentication(token: impl Into<String>) -> Self {
        Self {
            payload: serde_json::Value::String(token.into()),
            ..Self::new(MessageType::Authentication)
        }
    }

    /// Sets the coalescing key.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Bearer token carried by an authentication message.
    pub fn bearer_token(&self) -> Option<&str> {
        match self.kind {
            MessageType::Authentication => self.payload.as_str(),
            _ => None,
        }
    }
}
