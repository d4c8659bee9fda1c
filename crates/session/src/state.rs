//! Call states, outcomes and observer hooks

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use doorbell_signaling::RoomIdentifier;

use crate::error::SessionError;

/// Steps of one call attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    AwaitTrigger,
    JoinRoom,
    NotifyUser,
    AwaitPeer,
    PreparePeer,
    AwaitInvite,
    Negotiate,
    AwaitBye,
    Cleanup,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitTrigger => "AwaitTrigger",
            Self::JoinRoom => "JoinRoom",
            Self::NotifyUser => "NotifyUser",
            Self::AwaitPeer => "AwaitPeer",
            Self::PreparePeer => "PreparePeer",
            Self::AwaitInvite => "AwaitInvite",
            Self::Negotiate => "Negotiate",
            Self::AwaitBye => "AwaitBye",
            Self::Cleanup => "Cleanup",
        };
        f.write_str(name)
    }
}

/// How a call attempt ended
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Completed,
    Aborted {
        state: CallState,
        error: Arc<SessionError>,
    },
}

impl CallOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CallOutcome::Completed)
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            CallOutcome::Completed => None,
            CallOutcome::Aborted { error, .. } => Some(error.as_ref()),
        }
    }
}

/// Summary handed to [`CallEventHandler::on_call_ended`]
#[derive(Debug, Clone)]
pub struct CallReport {
    pub room: RoomIdentifier,
    pub outcome: CallOutcome,
    /// States entered, in order, starting with `JoinRoom`
    pub states: Vec<CallState>,
    pub duration: Duration,
}

/// Observer for call progress
#[async_trait]
pub trait CallEventHandler: Send + Sync {
    async fn on_call_state_changed(&self, _room: &RoomIdentifier, _from: CallState, _to: CallState) {}

    async fn on_call_ended(&self, _report: &CallReport) {}
}
