//! Checks run on a remote offer before the peer connection sees it
//!
//! The peer connection is lenient about offers it cannot use: a section
//! without a common codec just ends up inactive. [`inspect_offer`] turns
//! those cases into typed errors and extracts the tracks the offer
//! announces, so callers learn about them without waiting for RTP.

use crate::config::{CodecPreference, EngineConfig};
use crate::error::{Error, Result};
use crate::sdp::{MediaSection, SessionDescription};
use crate::track::{MediaKind, RemoteTrack};

/// Per-section outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SectionDecision {
    Accepted { kind: MediaKind, mid: String, formats: Vec<String> },
    Rejected { mid: Option<String>, reason: String },
}

#[derive(Debug, Clone)]
pub(crate) struct OfferSummary {
    pub sections: Vec<SectionDecision>,
    pub remote_tracks: Vec<RemoteTrack>,
}

pub(crate) fn inspect_offer(offer: &SessionDescription, config: &EngineConfig) -> Result<OfferSummary> {
    let session_direction = offer.direction();
    let mut sections = Vec::with_capacity(offer.media.len());
    let mut remote_tracks = Vec::new();

    for (index, section) in offer.media.iter().enumerate() {
        let mid = section.mid().map(str::to_string);
        let decision = decide_section(section, config).and_then(|(kind, formats)| {
            check_transport_attributes(offer, section)?;
            Ok((kind, formats))
        });

        match decision {
            Ok((kind, formats)) => {
                let mid = mid.unwrap_or_else(|| index.to_string());
                if section.direction().unwrap_or(session_direction).sends() {
                    remote_tracks.push(remote_track(section, &mid, kind));
                }
                sections.push(SectionDecision::Accepted { kind, mid, formats });
            }
            Err(Error::MalformedDescription(msg)) => return Err(Error::MalformedDescription(msg)),
            Err(e) => {
                tracing::debug!("Rejecting {} section {}: {}", section.media, index, e);
                sections.push(SectionDecision::Rejected {
                    mid,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !sections.iter().any(|s| matches!(s, SectionDecision::Accepted { .. })) {
        let reasons: Vec<&str> = sections
            .iter()
            .filter_map(|s| match s {
                SectionDecision::Rejected { reason, .. } => Some(reason.as_str()),
                SectionDecision::Accepted { .. } => None,
            })
            .collect();
        return Err(Error::Incompatible(format!("no usable media section ({})", reasons.join("; "))));
    }

    Ok(OfferSummary { sections, remote_tracks })
}

/// Media kind and usable payload types, or an `Incompatible` reason
fn decide_section(section: &MediaSection, config: &EngineConfig) -> Result<(MediaKind, Vec<String>)> {
    let kind = MediaKind::from_media(&section.media)
        .ok_or_else(|| Error::Incompatible(format!("unsupported media '{}'", section.media)))?;
    if !section.protocol.contains("RTP") {
        return Err(Error::Incompatible(format!("unsupported protocol '{}'", section.protocol)));
    }
    if section.port == 0 && !section.has_attribute("bundle-only") {
        return Err(Error::Incompatible("section disabled by offerer".to_string()));
    }

    let preferences = match kind {
        MediaKind::Audio => &config.audio_codecs,
        MediaKind::Video => &config.video_codecs,
    };
    let formats = select_formats(section, preferences);
    if formats.is_empty() {
        return Err(Error::Incompatible(format!("no common {} codec", kind)));
    }
    Ok((kind, formats))
}

fn check_transport_attributes(offer: &SessionDescription, section: &MediaSection) -> Result<()> {
    for name in ["ice-ufrag", "ice-pwd", "fingerprint"] {
        if section.attribute(name).or_else(|| offer.attribute(name)).is_none() {
            let mid = section.mid().unwrap_or("?");
            return Err(Error::malformed(format!("section '{}' lacks a={}", mid, name)));
        }
    }
    Ok(())
}

/// `(encoding name, clock rate)` of a payload type
fn codec_of(section: &MediaSection, pt: &str) -> Option<(String, u32)> {
    if let Some(rtpmap) = section.format_attribute("rtpmap", pt) {
        let mut parts = rtpmap.split('/');
        let name = parts.next()?.to_string();
        let clock_rate = parts.next()?.parse().ok()?;
        return Some((name, clock_rate));
    }
    match pt {
        "0" => Some(("PCMU".to_string(), 8000)),
        "8" => Some(("PCMA".to_string(), 8000)),
        "9" => Some(("G722".to_string(), 8000)),
        _ => None,
    }
}

/// Preferred payload types plus the `rtx` formats repairing them
fn select_formats(section: &MediaSection, preferences: &[CodecPreference]) -> Vec<String> {
    let primary: Vec<&String> = section
        .formats
        .iter()
        .filter(|pt| {
            codec_of(section, pt)
                .map_or(false, |(name, rate)| preferences.iter().any(|p| p.matches(&name, rate)))
        })
        .collect();

    section
        .formats
        .iter()
        .filter(|pt| {
            if primary.contains(pt) {
                return true;
            }
            let is_rtx = codec_of(section, pt).map_or(false, |(name, _)| name.eq_ignore_ascii_case("rtx"));
            is_rtx
                && section
                    .format_attribute("fmtp", pt)
                    .and_then(|fmtp| fmtp.split(';').find_map(|p| p.trim().strip_prefix("apt=")))
                    .map_or(false, |apt| primary.iter().any(|accepted| accepted.as_str() == apt))
        })
        .cloned()
        .collect()
}

fn remote_track(section: &MediaSection, mid: &str, kind: MediaKind) -> RemoteTrack {
    let msid = section.attribute("msid").map(|value| {
        let mut parts = value.split_whitespace();
        (parts.next().map(str::to_string), parts.next().map(str::to_string))
    });
    let (stream_id, track_id) = msid.unwrap_or((None, None));
    RemoteTrack {
        mid: mid.to_string(),
        kind,
        stream_id,
        track_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::parse_sdp;

    fn offer(body: &str) -> SessionDescription {
        let head = "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
                    a=ice-ufrag:abcd\r\na=ice-pwd:0123456789abcdefghijklmn\r\n\
                    a=fingerprint:sha-256 00:11\r\na=setup:actpass\r\n";
        parse_sdp(&format!("{}{}", head, body)).unwrap()
    }

    fn accepted_formats(summary: &OfferSummary, index: usize) -> Vec<String> {
        match &summary.sections[index] {
            SectionDecision::Accepted { formats, .. } => formats.clone(),
            other => panic!("section {} not accepted: {:?}", index, other),
        }
    }

    #[test]
    fn keeps_preferred_codecs_and_their_rtx() {
        let sdp = offer(
            "m=video 9 UDP/TLS/RTP/SAVPF 96 97 98 99 100\r\na=mid:0\r\n\
             a=rtpmap:96 VP8/90000\r\na=rtpmap:97 rtx/90000\r\na=fmtp:97 apt=96\r\n\
             a=rtpmap:98 VP9/90000\r\na=rtpmap:99 rtx/90000\r\na=fmtp:99 apt=98\r\n\
             a=rtpmap:100 H264/90000\r\n",
        );
        let summary = inspect_offer(&sdp, &EngineConfig::default()).unwrap();
        assert_eq!(accepted_formats(&summary, 0), vec!["96", "97", "100"]);
    }

    #[test]
    fn static_payload_types_without_rtpmap() {
        let sdp = offer("m=audio 9 UDP/TLS/RTP/SAVPF 0 8 13\r\na=mid:a\r\n");
        let summary = inspect_offer(&sdp, &EngineConfig::default()).unwrap();
        assert_eq!(accepted_formats(&summary, 0), vec!["0", "8"]);
    }

    #[test]
    fn data_channel_section_is_rejected_but_media_accepted() {
        let sdp = offer(
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=mid:0\r\na=rtpmap:111 opus/48000/2\r\n\
             m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\na=mid:1\r\n",
        );
        let summary = inspect_offer(&sdp, &EngineConfig::default()).unwrap();
        assert!(matches!(summary.sections[1], SectionDecision::Rejected { .. }));
    }

    #[test]
    fn disabled_section_is_rejected_unless_bundle_only() {
        let sdp = offer(
            "m=audio 0 UDP/TLS/RTP/SAVPF 111\r\na=mid:0\r\na=rtpmap:111 opus/48000/2\r\n\
             m=audio 0 UDP/TLS/RTP/SAVPF 111\r\na=mid:1\r\na=bundle-only\r\na=rtpmap:111 opus/48000/2\r\n",
        );
        let summary = inspect_offer(&sdp, &EngineConfig::default()).unwrap();
        assert!(matches!(summary.sections[0], SectionDecision::Rejected { .. }));
        assert!(matches!(summary.sections[1], SectionDecision::Accepted { .. }));
    }

    #[test]
    fn nothing_usable_is_incompatible() {
        let sdp = offer("m=video 9 UDP/TLS/RTP/SAVPF 98\r\na=rtpmap:98 VP9/90000\r\n");
        assert!(matches!(
            inspect_offer(&sdp, &EngineConfig::default()),
            Err(Error::Incompatible(_))
        ));
    }

    #[test]
    fn missing_fingerprint_is_malformed() {
        let sdp = parse_sdp(
            "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
             m=audio 9 UDP/TLS/RTP/SAVPF 0\r\na=ice-ufrag:x\r\na=ice-pwd:y\r\n",
        )
        .unwrap();
        assert!(matches!(
            inspect_offer(&sdp, &EngineConfig::default()),
            Err(Error::MalformedDescription(_))
        ));
    }

    #[test]
    fn remote_tracks_follow_offered_direction() {
        let sdp = offer(
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=mid:0\r\na=sendrecv\r\na=msid:stream track-a\r\n\
             a=rtpmap:111 opus/48000/2\r\n\
             m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=mid:1\r\na=recvonly\r\na=rtpmap:96 VP8/90000\r\n",
        );
        let summary = inspect_offer(&sdp, &EngineConfig::default()).unwrap();
        assert_eq!(
            summary.remote_tracks,
            vec![RemoteTrack {
                mid: "0".into(),
                kind: MediaKind::Audio,
                stream_id: Some("stream".into()),
                track_id: Some("track-a".into()),
            }]
        );
    }
}
