use thiserror::Error;

/// Result type for negotiation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the negotiation engine
#[derive(Debug, Error)]
pub enum Error {
    /// Operation is not allowed in the engine's current state
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::engine::NegotiationState,
    },

    /// Session description could not be parsed or misses required fields
    #[error("Malformed session description: {0}")]
    MalformedDescription(String),

    /// Offer shares no usable media section with the local side
    #[error("Incompatible offer: {0}")]
    Incompatible(String),

    /// ICE or DTLS did not bring the peer connection up
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure inside the peer connection
    #[error("WebRTC error: {0}")]
    Rtc(#[from] webrtc::Error),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedDescription(msg.into())
    }

    pub fn invalid_state(operation: &'static str, state: crate::engine::NegotiationState) -> Self {
        Error::InvalidState { operation, state }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedDescription(err.to_string())
    }
}
