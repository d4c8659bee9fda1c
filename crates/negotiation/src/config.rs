//! Negotiation engine configuration

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Codec the local side is willing to use, matched by name and clock rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecPreference {
    pub name: String,
    pub clock_rate: u32,
}

impl CodecPreference {
    pub fn new(name: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            name: name.into(),
            clock_rate,
        }
    }

    pub fn matches(&self, name: &str, clock_rate: u32) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.clock_rate == clock_rate
    }
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Only gather candidates on this address; unspecified means every
    /// interface
    pub bind_address: IpAddr,

    /// `host:port`, optionally prefixed with `stun:`
    pub stun_servers: Vec<String>,

    /// Upper bound for candidate gathering
    pub gathering_timeout_ms: u64,

    /// Offer loopback host candidates too
    pub include_loopback: bool,

    pub audio_codecs: Vec<CodecPreference>,
    pub video_codecs: Vec<CodecPreference>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            stun_servers: vec!["stun.l.google.com:19302".to_string()],
            gathering_timeout_ms: 3000,
            include_loopback: false,
            audio_codecs: vec![
                CodecPreference::new("opus", 48000),
                CodecPreference::new("PCMU", 8000),
                CodecPreference::new("PCMA", 8000),
            ],
            video_codecs: vec![CodecPreference::new("VP8", 90000), CodecPreference::new("H264", 90000)],
        }
    }
}

impl EngineConfig {
    /// Loopback only, no STUN; handy for tests and LAN setups
    pub fn local() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            stun_servers: Vec::new(),
            gathering_timeout_ms: 2000,
            include_loopback: true,
            ..Default::default()
        }
    }

    pub fn gathering_timeout(&self) -> Duration {
        Duration::from_millis(self.gathering_timeout_ms)
    }
}
