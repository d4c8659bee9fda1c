//! The signaling channel abstraction used by the call state machine

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::event::{EventKind, RoomIdentifier};
use crate::queue::EventSender;

/// Connection to a signaling server.
///
/// Implementations funnel every inbound message, whatever its kind, into
/// the [`EventSender`] handed to [`connect`](SignalingChannel::connect).
/// Sending is fire-and-forget: replies arrive as ordinary inbound events.
#[async_trait]
pub trait SignalingChannel: Send {
    /// Open the connection. Calling it on an open connection is a no-op.
    async fn connect(&mut self, endpoint: &str, events: EventSender) -> Result<()>;

    /// Ask the server to enter (or create) `room`
    async fn join(&mut self, room: &RoomIdentifier) -> Result<()> {
        self.send(EventKind::Join, Value::from(room)).await
    }

    /// Emit a signaling message
    async fn send(&mut self, kind: EventKind, payload: Value) -> Result<()>;

    /// Close the connection. Safe to call any number of times.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the connection is currently open
    fn is_connected(&self) -> bool;
}
