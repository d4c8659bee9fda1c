//! Signaling message vocabulary

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a signaling message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Client asks to enter or create a room (client → server)
    Join,
    /// Room did not exist and was created for this client
    Created,
    /// Room already existed; client was denied the primary role
    Joined,
    /// Room already has two participants
    Full,
    /// A second participant joined the client's room
    NewPeer,
    /// Remote offer forwarded from the new peer
    Invite,
    /// Local answer sent back through the room (client → server)
    Ok,
    /// Call or room teardown notice
    Bye,
    /// Anything outside the vocabulary above
    Other(String),
}

impl EventKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::Join => "join",
            Self::Created => "created",
            Self::Joined => "joined",
            Self::Full => "full",
            Self::NewPeer => "new_peer",
            Self::Invite => "invite",
            Self::Ok => "ok",
            Self::Bye => "bye",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "join" => Self::Join,
            "created" => Self::Created,
            "joined" => Self::Joined,
            "full" => Self::Full,
            "new_peer" => Self::NewPeer,
            "invite" => Self::Invite,
            "ok" => Self::Ok,
            "bye" => Self::Bye,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound signaling message.
///
/// Immutable once constructed; the payload is interpreted by whoever
/// consumes the event (room name string, session description object, or
/// `null`).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalingEvent {
    kind: EventKind,
    payload: Value,
}

impl SignalingEvent {
    /// Create a new event
    pub fn new(kind: impl Into<EventKind>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create an event without payload
    pub fn bare(kind: impl Into<EventKind>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Kind of this event
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Payload of this event
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Payload as a string, when it is one
    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_str()
    }

    /// Consume the event and keep its payload
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// Name of a rendezvous room on the signaling server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomIdentifier(String);

impl RoomIdentifier {
    /// Generate a fresh, collision-resistant room name (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use an explicit room name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Room name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&RoomIdentifier> for Value {
    fn from(room: &RoomIdentifier) -> Self {
        Value::String(room.0.clone())
    }
}
