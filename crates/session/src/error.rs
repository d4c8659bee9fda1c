use std::time::Duration;

use doorbell_signaling::EventKind;
use thiserror::Error;

use crate::media::MediaError;
use crate::state::CallState;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Why a call attempt ended early
///
/// None of these are fatal to the process: the state machine cleans up and
/// waits for the next trigger.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Signaling transport failure
    #[error("Signaling connection error: {0}")]
    Connection(#[from] doorbell_signaling::Error),

    /// Nothing arrived at a wait point within its timeout
    #[error("Timed out after {after:?} in {state}")]
    TimedOut { state: CallState, after: Duration },

    /// Wrong message at a wait point
    #[error("Unexpected '{received}' in {state}, expected '{expected}'")]
    UnexpectedEventKind {
        state: CallState,
        expected: EventKind,
        received: EventKind,
    },

    /// Remote offer could not be answered
    #[error("Negotiation error: {0}")]
    Negotiation(#[from] doorbell_negotiation::Error),

    /// Camera, microphone or speaker could not be acquired
    #[error("Media unavailable: {0}")]
    MediaUnavailable(#[from] MediaError),

    /// Trigger source failed
    #[error("Trigger error: {0}")]
    Trigger(String),
}

impl SessionError {
    pub fn trigger(msg: impl Into<String>) -> Self {
        SessionError::Trigger(msg.into())
    }

    /// Timeouts and mismatches are the expected "nobody answered" outcome
    pub fn is_no_show(&self) -> bool {
        matches!(self, SessionError::TimedOut { .. } | SessionError::UnexpectedEventKind { .. })
    }
}
