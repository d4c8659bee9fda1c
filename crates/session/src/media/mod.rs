//! Media collaborators and the bridge wiring them to the negotiation engine
//!
//! Capturing and rendering media is not done here. A [`MediaSource`] is an
//! opened capture device whose track gets announced in the answer, a
//! [`MediaSink`] receives the remote tracks the offer announces.

mod devices;

use std::sync::Arc;

use async_trait::async_trait;
use doorbell_negotiation::{LocalTrack, MediaKind, NegotiationEngine, RemoteTrack};
use thiserror::Error;
use tracing::{debug, warn};

pub use devices::{ConfiguredDevices, DeviceConfig, DeviceSink, DeviceSource, MediaConfig};

/// Device acquisition or wiring failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("device {device} unavailable: {reason}")]
    Unavailable { device: String, reason: String },

    #[error("sink rejected track: {0}")]
    Sink(String),
}

impl MediaError {
    pub fn unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        MediaError::Unavailable {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

/// Opened capture device
pub trait MediaSource: Send {
    fn kind(&self) -> MediaKind;

    /// Device name used as track label
    fn label(&self) -> &str;

    /// Give the device back; called once when the call ends
    fn release(&mut self) {}
}

/// Opened playback device
pub trait MediaSink: Send + Sync {
    /// Route a remote track to this sink
    fn attach(&self, track: &RemoteTrack) -> Result<(), MediaError>;

    fn release(&self) {}
}

/// Opens the devices for one call
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_sources(&self) -> Result<Vec<Box<dyn MediaSource>>, MediaError>;

    async fn open_sink(&self) -> Result<Arc<dyn MediaSink>, MediaError>;
}

/// Bindings between the devices of one call and its negotiation engine
///
/// Released exactly once, either explicitly or when dropped.
#[derive(Default)]
pub struct MediaBridge {
    sources: Vec<Box<dyn MediaSource>>,
    sink: Option<Arc<dyn MediaSink>>,
    released: bool,
}

impl MediaBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce `source` as an outgoing track on `engine`
    ///
    /// The bridge owns the source from here on, even when the engine
    /// refuses the track.
    pub async fn attach_source(
        &mut self,
        engine: &mut NegotiationEngine,
        source: Box<dyn MediaSource>,
    ) -> Result<(), doorbell_negotiation::Error> {
        let track = LocalTrack::new(source.kind(), source.label());
        debug!("Attaching {} source {}", source.kind(), source.label());
        self.sources.push(source);
        engine.add_outgoing_track(track).await
    }

    /// Route `track` to `sink`
    pub fn attach_sink(sink: &dyn MediaSink, track: &RemoteTrack) -> Result<(), MediaError> {
        debug!("Attaching remote {} track (mid {}) to sink", track.kind, track.mid);
        sink.attach(track)
    }

    /// Route every remote track `engine` reports to `sink`
    pub fn bind_sink(&mut self, engine: &mut NegotiationEngine, sink: Arc<dyn MediaSink>) {
        let target = sink.clone();
        engine.on_remote_track(move |track| {
            if let Err(e) = Self::attach_sink(target.as_ref(), &track) {
                warn!("Remote {} track not attached: {}", track.kind, e);
            }
        });
        self.sink = Some(sink);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Release every bound device; later calls do nothing
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for source in &mut self.sources {
            source.release();
        }
        self.sources.clear();
        if let Some(sink) = self.sink.take() {
            sink.release();
        }
        debug!("Media bindings released");
    }
}

impl Drop for MediaBridge {
    fn drop(&mut self) {
        self.release();
    }
}
