//! Signaling layer for the doorbell call stack
//!
//! This crate owns everything between the signaling server and the call
//! state machine:
//!
//! - [`SignalingEvent`] / [`EventKind`]: the message vocabulary
//! - [`EventQueue`]: the FIFO hand-off from the receive loop to the state machine
//! - [`SignalingChannel`]: connect / join / send / disconnect
//! - [`WebSocketSignalingChannel`]: Socket.IO (Engine.IO v4) over WebSocket
//!
//! Every inbound message is funneled into the [`EventQueue`] regardless of
//! its kind; deciding what is expected at a given point is the caller's job.

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod queue;
pub mod transport;

pub use channel::SignalingChannel;
pub use config::SignalingConfig;
pub use error::{Error, Result};
pub use event::{EventKind, RoomIdentifier, SignalingEvent};
pub use queue::{EventQueue, EventSender, QueueError};
pub use transport::ws::WebSocketSignalingChannel;

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        Error, EventKind, EventQueue, EventSender, QueueError, Result, RoomIdentifier, SignalingChannel,
        SignalingConfig, SignalingEvent, WebSocketSignalingChannel,
    };
}
