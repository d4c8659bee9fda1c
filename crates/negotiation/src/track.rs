//! Outgoing and remote media tracks

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Media kind of a track or `m=` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_media(media: &str) -> Option<Self> {
        match media {
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Track the local side offers to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub kind: MediaKind,
    pub id: String,
    pub stream_id: String,
    pub label: String,
}

impl LocalTrack {
    /// New track with a random id; `label` names the source feeding it
    pub fn new(kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            id: uuid::Uuid::new_v4().to_string(),
            stream_id: String::new(),
            label: label.into(),
        }
    }
}

/// Track announced by the remote offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub mid: String,
    pub kind: MediaKind,
    pub stream_id: Option<String>,
    pub track_id: Option<String>,
}

/// Callback fired for every remote track
pub type RemoteTrackHandler = Arc<dyn Fn(RemoteTrack) + Send + Sync>;
