//! Signaling transports

mod tls;
pub mod ws;

pub use ws::{socket_io_url, WebSocketSignalingChannel};
