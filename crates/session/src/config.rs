//! Session timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts for the call state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bound for every wait point (join reply, peer, invite)
    pub step_timeout_secs: u64,

    /// How long an established call may last before hanging up; `None`
    /// ends the session right after the answer is sent
    pub hangup_timeout_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 10,
            hangup_timeout_secs: Some(300),
        }
    }
}

impl SessionConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn hangup_timeout(&self) -> Option<Duration> {
        self.hangup_timeout_secs.map(Duration::from_secs)
    }
}
