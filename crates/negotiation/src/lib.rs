//! Offer/answer negotiation for the doorbell call stack
//!
//! [`NegotiationEngine`] plays the answering side of a WebRTC call. It
//! checks the browser's offer against the configured codecs, hands it to a
//! `webrtc` peer connection together with the locally attached tracks and
//! produces a complete (non-trickle) answer once candidate gathering is done.
//!
//! ```no_run
//! # async fn example(offer: serde_json::Value) -> doorbell_negotiation::Result<()> {
//! use doorbell_negotiation::prelude::*;
//!
//! let mut engine = NegotiationEngine::new(EngineConfig::default()).await?;
//! engine.on_remote_track(|track| println!("remote {} track on mid {}", track.kind, track.mid));
//! engine.add_outgoing_track(LocalTrack::new(MediaKind::Video, "/dev/video0")).await?;
//! engine.set_remote_offer(&RtcSessionDescription::from_value(&offer)?).await?;
//! engine.create_answer().await?;
//! let answer = engine.local_description().await?;
//! # let _ = answer;
//! engine.close().await;
//! # Ok(())
//! # }
//! ```

mod codecs;
pub mod config;
pub mod description;
pub mod engine;
pub mod error;
mod offer;
pub mod sdp;
pub mod track;

pub use config::{CodecPreference, EngineConfig};
pub use description::{RtcSessionDescription, SdpType};
pub use engine::{ConnectionState, NegotiationEngine, NegotiationState};
pub use error::{Error, Result};
pub use track::{LocalTrack, MediaKind, RemoteTrack, RemoteTrackHandler};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        ConnectionState, EngineConfig, Error, LocalTrack, MediaKind, NegotiationEngine, NegotiationState, RemoteTrack, Result,
        RtcSessionDescription, SdpType,
    };
}
