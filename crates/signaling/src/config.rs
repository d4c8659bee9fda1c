//! Signaling channel configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for connecting to the signaling server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Server address, e.g. `https://10.0.0.5:443` (`http`, `https`, `ws`, `wss`)
    pub endpoint: String,

    /// Upper bound for the TCP/TLS/WebSocket handshake plus namespace connect
    pub connect_timeout_secs: u64,

    /// How long `disconnect` waits for queued frames to be flushed
    pub close_timeout_ms: u64,

    /// Accept any server certificate. Only honoured with the
    /// `dev-insecure-tls` feature.
    #[cfg(feature = "dev-insecure-tls")]
    pub tls_insecure_skip_verify: bool,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:443".to_string(),
            connect_timeout_secs: 5,
            close_timeout_ms: 500,
            #[cfg(feature = "dev-insecure-tls")]
            tls_insecure_skip_verify: false,
        }
    }
}

impl SignalingConfig {
    /// Configuration for the given endpoint with default timeouts
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}
