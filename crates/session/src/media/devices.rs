//! Devices described in configuration

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use doorbell_negotiation::{MediaKind, RemoteTrack};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{MediaDevices, MediaError, MediaSink, MediaSource};

/// One capture or playback device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device node (`/dev/video0`) or backend device name (`default`)
    pub path: String,
    /// Backend, e.g. `v4l2`, `pulse`, `alsa`
    pub format: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl DeviceConfig {
    pub fn new(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Device nodes must exist; backend names are resolved by the backend
    async fn check_available(&self) -> Result<(), MediaError> {
        if !self.path.starts_with("/dev/") {
            return Ok(());
        }
        tokio::fs::metadata(Path::new(&self.path))
            .await
            .map(|_| ())
            .map_err(|e| MediaError::unavailable(&self.path, e.to_string()))
    }
}

/// Devices for a call; `None` leaves that role out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub video: Option<DeviceConfig>,
    pub audio: Option<DeviceConfig>,
    pub sink: Option<DeviceConfig>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            video: Some(DeviceConfig::new("/dev/video0", "v4l2").with_option("video_size", "320x240")),
            audio: Some(DeviceConfig::new("default", "pulse")),
            sink: Some(DeviceConfig::new("default", "alsa")),
        }
    }
}

/// [`MediaDevices`] backed by [`MediaConfig`]
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDevices {
    config: MediaConfig,
}

impl ConfiguredDevices {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaDevices for ConfiguredDevices {
    async fn open_sources(&self) -> Result<Vec<Box<dyn MediaSource>>, MediaError> {
        let mut sources: Vec<Box<dyn MediaSource>> = Vec::new();
        let wanted = [(MediaKind::Video, &self.config.video), (MediaKind::Audio, &self.config.audio)];

        for (kind, device) in wanted {
            let Some(device) = device else { continue };
            device.check_available().await?;
            debug!("Opened {} source {} ({})", kind, device.path, device.format);
            sources.push(Box::new(DeviceSource::new(kind, device.clone())));
        }
        Ok(sources)
    }

    async fn open_sink(&self) -> Result<Arc<dyn MediaSink>, MediaError> {
        let device = self
            .config
            .sink
            .clone()
            .unwrap_or_else(|| DeviceConfig::new("null", "null"));
        device.check_available().await?;
        let sink: Arc<dyn MediaSink> = Arc::new(DeviceSink::new(device));
        Ok(sink)
    }
}

/// Capture device opened for one call
#[derive(Debug)]
pub struct DeviceSource {
    kind: MediaKind,
    device: DeviceConfig,
    open: bool,
}

impl DeviceSource {
    pub fn new(kind: MediaKind, device: DeviceConfig) -> Self {
        Self {
            kind,
            device,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl MediaSource for DeviceSource {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.device.path
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            debug!("Released {} source {}", self.kind, self.device.path);
        }
    }
}

/// Playback device receiving the visitor's tracks
#[derive(Debug)]
pub struct DeviceSink {
    device: DeviceConfig,
    tracks: Mutex<Vec<RemoteTrack>>,
}

impl DeviceSink {
    pub fn new(device: DeviceConfig) -> Self {
        Self {
            device,
            tracks: Mutex::new(Vec::new()),
        }
    }

    pub fn attached(&self) -> Vec<RemoteTrack> {
        self.tracks.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl MediaSink for DeviceSink {
    fn attach(&self, track: &RemoteTrack) -> Result<(), MediaError> {
        let mut tracks = self
            .tracks
            .lock()
            .map_err(|_| MediaError::Sink(format!("sink {} poisoned", self.device.path)))?;
        info!(
            "Playing remote {} track on {} ({})",
            track.kind, self.device.path, self.device.format
        );
        tracks.push(track.clone());
        Ok(())
    }

    fn release(&self) {
        if let Ok(mut tracks) = self.tracks.lock() {
            tracks.clear();
        }
        debug!("Released sink {}", self.device.path);
    }
}
