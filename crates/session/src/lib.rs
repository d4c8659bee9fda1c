//! Call session orchestration for the doorbell
//!
//! [`CallSessionStateMachine`] waits for a [`Trigger`], opens a room on the
//! signaling server, tells the resident through a [`Notifier`], and answers
//! the resident's browser once it joins. Devices come from a
//! [`MediaDevices`] implementation and are wired to the negotiation engine
//! by the [`MediaBridge`].

pub mod config;
pub mod error;
pub mod machine;
pub mod media;
pub mod notify;
pub mod session;
pub mod state;
pub mod trigger;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use machine::CallSessionStateMachine;
pub use media::{ConfiguredDevices, DeviceConfig, MediaBridge, MediaConfig, MediaDevices, MediaError, MediaSink, MediaSource};
pub use notify::{ConsoleNotifier, Notifier, NotifyConfig};
pub use session::CallSession;
pub use state::{CallEventHandler, CallOutcome, CallReport, CallState};
pub use trigger::{ChannelTrigger, Trigger};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        CallEventHandler, CallOutcome, CallReport, CallSessionStateMachine, CallState, ChannelTrigger,
        ConfiguredDevices, ConsoleNotifier, MediaDevices, MediaSink, MediaSource, Notifier, SessionConfig,
        SessionError, Trigger,
    };
}
