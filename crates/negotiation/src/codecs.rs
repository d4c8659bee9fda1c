//! Codec preferences mapped onto the peer connection's media engine

use webrtc::api::media_engine::{
    MediaEngine, MIME_TYPE_G722, MIME_TYPE_H264, MIME_TYPE_OPUS, MIME_TYPE_PCMA, MIME_TYPE_PCMU, MIME_TYPE_VP8,
    MIME_TYPE_VP9,
};
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType};
use webrtc::rtp_transceiver::RTCPFeedback;

use crate::config::{CodecPreference, EngineConfig};
use crate::error::{Error, Result};
use crate::track::MediaKind;

fn video_feedback() -> Vec<RTCPFeedback> {
    [("goog-remb", ""), ("ccm", "fir"), ("nack", ""), ("nack", "pli")]
        .into_iter()
        .map(|(typ, parameter)| RTCPFeedback {
            typ: typ.to_string(),
            parameter: parameter.to_string(),
        })
        .collect()
}

/// Payload parameters for a preferred codec, `None` when unknown
pub(crate) fn parameters(preference: &CodecPreference) -> Option<RTCRtpCodecParameters> {
    let (mime_type, payload_type, channels, fmtp) = match preference.name.to_ascii_lowercase().as_str() {
        "opus" => (MIME_TYPE_OPUS, 111, 2, "minptime=10;useinbandfec=1"),
        "pcmu" => (MIME_TYPE_PCMU, 0, 0, ""),
        "pcma" => (MIME_TYPE_PCMA, 8, 0, ""),
        "g722" => (MIME_TYPE_G722, 9, 0, ""),
        "vp8" => (MIME_TYPE_VP8, 96, 0, ""),
        "vp9" => (MIME_TYPE_VP9, 98, 0, "profile-id=0"),
        "h264" => (
            MIME_TYPE_H264,
            102,
            0,
            "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
        ),
        _ => return None,
    };
    let rtcp_feedback = if mime_type.starts_with("video/") {
        video_feedback()
    } else {
        Vec::new()
    };

    Some(RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: mime_type.to_string(),
            clock_rate: preference.clock_rate,
            channels,
            sdp_fmtp_line: fmtp.to_string(),
            rtcp_feedback,
        },
        payload_type,
        stats_id: String::new(),
    })
}

/// Media engine carrying exactly the configured codecs
pub(crate) fn media_engine(config: &EngineConfig) -> Result<MediaEngine> {
    let mut engine = MediaEngine::default();
    let mut registered = 0;

    for (preferences, kind) in [
        (&config.audio_codecs, RTPCodecType::Audio),
        (&config.video_codecs, RTPCodecType::Video),
    ] {
        for preference in preferences {
            match parameters(preference) {
                Some(params) => {
                    engine.register_codec(params, kind)?;
                    registered += 1;
                }
                None => tracing::warn!("Ignoring unknown codec preference {}", preference.name),
            }
        }
    }

    if registered == 0 {
        return Err(Error::Incompatible("no known codec configured".to_string()));
    }
    Ok(engine)
}

/// Capability for an outgoing track of `kind`: the first known preference
pub(crate) fn outgoing_capability(config: &EngineConfig, kind: MediaKind) -> Option<RTCRtpCodecCapability> {
    let preferences = match kind {
        MediaKind::Audio => &config.audio_codecs,
        MediaKind::Video => &config.video_codecs,
    };
    preferences.iter().find_map(parameters).map(|p| p.capability)
}
