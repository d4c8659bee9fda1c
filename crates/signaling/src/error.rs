use thiserror::Error;

/// Result type for signaling operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the signaling channel
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or TLS failure while connecting or talking to the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// TLS handshake or certificate validation failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// Operation requires an open connection
    #[error("Not connected to a signaling server")]
    NotConnected,

    /// Endpoint could not be turned into a WebSocket URL
    #[error("Invalid signaling endpoint: {0}")]
    InvalidEndpoint(String),

    /// Frame did not follow the Engine.IO / Socket.IO framing
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        match err {
            tokio_tungstenite::tungstenite::Error::Tls(e) => Error::Tls(e.to_string()),
            other => Error::Connection(other.to_string()),
        }
    }
}
