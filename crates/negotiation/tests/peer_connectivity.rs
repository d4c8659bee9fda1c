//! The answer must let a real WebRTC offerer reach `connected`

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS};
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::ice::mdns::MulticastDnsMode;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use doorbell_negotiation::prelude::*;

/// Browser stand-in: loopback only, sends microphone audio, wants video
async fn visitor() -> (Arc<RTCPeerConnection>, watch::Receiver<RTCPeerConnectionState>) {
    let mut media = MediaEngine::default();
    media.register_default_codecs().unwrap();
    let registry = register_default_interceptors(Registry::new(), &mut media).unwrap();

    let mut settings = SettingEngine::default();
    settings.set_ice_multicast_dns_mode(MulticastDnsMode::Disabled);
    settings.set_include_loopback_candidate(true);
    settings.set_ip_filter(Box::new(|ip| ip == IpAddr::V4(Ipv4Addr::LOCALHOST)));

    let api = APIBuilder::new()
        .with_media_engine(media)
        .with_interceptor_registry(registry)
        .with_setting_engine(settings)
        .build();
    let pc = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await.unwrap());

    let mic = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        "visitor-mic".to_owned(),
        "visitor".to_owned(),
    ));
    pc.add_track(mic as Arc<dyn TrackLocal + Send + Sync>).await.unwrap();
    pc.add_transceiver_from_kind(
        RTPCodecType::Video,
        Some(RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Recvonly,
            send_encodings: vec![],
        }),
    )
    .await
    .unwrap();

    let (tx, rx) = watch::channel(RTCPeerConnectionState::New);
    pc.on_peer_connection_state_change(Box::new(move |state| {
        let _ = tx.send(state);
        Box::pin(async {})
    }));
    (pc, rx)
}

async fn complete_offer(pc: &RTCPeerConnection) -> String {
    let offer = pc.create_offer(None).await.unwrap();
    let mut gathered = pc.gathering_complete_promise().await;
    pc.set_local_description(offer).await.unwrap();
    let _ = gathered.recv().await;
    pc.local_description().await.unwrap().sdp
}

#[tokio::test]
async fn answer_connects_over_loopback() {
    let (visitor, mut visitor_state) = visitor().await;
    let offer = tokio::time::timeout(Duration::from_secs(5), complete_offer(&visitor))
        .await
        .expect("visitor gathering");

    let announced = Arc::new(Mutex::new(Vec::new()));
    let mut engine = NegotiationEngine::new(EngineConfig::local()).await.expect("engine");
    let sink = announced.clone();
    engine.on_remote_track(move |track| sink.lock().unwrap().push(track));
    engine
        .add_outgoing_track(LocalTrack::new(MediaKind::Video, "/dev/video0"))
        .await
        .expect("camera");
    engine
        .add_outgoing_track(LocalTrack::new(MediaKind::Audio, "default"))
        .await
        .expect("speaker");

    engine
        .set_remote_offer(&RtcSessionDescription::offer(offer))
        .await
        .expect("offer accepted");
    engine.create_answer().await.expect("answer");
    let answer = engine.local_description().await.expect("complete answer");
    assert!(answer.sdp.contains("a=candidate:"));

    {
        let tracks = announced.lock().unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].kind, MediaKind::Audio);
        assert_eq!(tracks[0].track_id.as_deref(), Some("visitor-mic"));
    }

    visitor
        .set_remote_description(RTCSessionDescription::answer(answer.sdp).unwrap())
        .await
        .expect("visitor applies answer");

    engine
        .wait_connected(Duration::from_secs(10))
        .await
        .expect("engine side connected");
    assert_eq!(engine.connection_state(), ConnectionState::Connected);

    tokio::time::timeout(
        Duration::from_secs(10),
        visitor_state.wait_for(|state| *state == RTCPeerConnectionState::Connected),
    )
    .await
    .expect("visitor connected in time")
    .expect("visitor state channel open");

    engine.close().await;
    visitor.close().await.unwrap();
}

#[tokio::test]
async fn waiting_for_connection_times_out_without_peer() {
    let (visitor, _) = visitor().await;
    let offer = complete_offer(&visitor).await;
    visitor.close().await.unwrap();

    let mut engine = NegotiationEngine::new(EngineConfig::local()).await.expect("engine");
    engine
        .set_remote_offer(&RtcSessionDescription::offer(offer))
        .await
        .expect("offer accepted");
    engine.create_answer().await.expect("answer");
    engine.local_description().await.expect("answer");

    assert!(matches!(
        engine.wait_connected(Duration::from_millis(500)).await,
        Err(Error::Connection(_))
    ));
    engine.close().await;
}
