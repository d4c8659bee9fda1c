//! Peer connection for one call: offer in, answer with candidates out

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::ice::mdns::MulticastDnsMode;
use webrtc::ice::network_type::NetworkType;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::codecs;
use crate::config::EngineConfig;
use crate::description::{RtcSessionDescription, SdpType};
use crate::error::{Error, Result};
use crate::offer::inspect_offer;
use crate::sdp::parse_sdp;
use crate::track::{LocalTrack, RemoteTrack, RemoteTrackHandler};

/// Connectivity of the underlying peer connection
pub type ConnectionState = RTCPeerConnectionState;

/// Lifecycle of a [`NegotiationEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Fresh,
    HasOutgoingTracks,
    HasRemoteOffer,
    HasLocalAnswer,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::HasOutgoingTracks => write!(f, "has-outgoing-tracks"),
            Self::HasRemoteOffer => write!(f, "has-remote-offer"),
            Self::HasLocalAnswer => write!(f, "has-local-answer"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Answering side of a single offer/answer exchange
///
/// Operations must follow the order
/// `add_outgoing_track* → set_remote_offer → create_answer → local_description`;
/// anything else fails with [`Error::InvalidState`]. [`close`](Self::close)
/// is valid at any time and idempotent.
///
/// ICE, DTLS and SRTP are run by the wrapped [`RTCPeerConnection`]; the
/// engine adds the ordering rules, offer checks and the non-trickle answer.
pub struct NegotiationEngine {
    config: EngineConfig,
    state: NegotiationState,
    stream_id: String,
    peer: Arc<RTCPeerConnection>,
    connection: watch::Receiver<ConnectionState>,
    local_tracks: Vec<LocalTrack>,
    remote_tracks: Vec<RemoteTrack>,
    gathering: Option<mpsc::Receiver<()>>,
    local_description: Option<RtcSessionDescription>,
    on_remote_track: Option<RemoteTrackHandler>,
}

fn ice_servers(config: &EngineConfig) -> Vec<RTCIceServer> {
    if config.stun_servers.is_empty() {
        return Vec::new();
    }
    let urls = config
        .stun_servers
        .iter()
        .map(|server| {
            if server.starts_with("stun:") || server.starts_with("stuns:") {
                server.clone()
            } else {
                format!("stun:{}", server)
            }
        })
        .collect();
    vec![RTCIceServer {
        urls,
        ..Default::default()
    }]
}

fn setting_engine(config: &EngineConfig) -> SettingEngine {
    let mut settings = SettingEngine::default();
    settings.set_ice_multicast_dns_mode(MulticastDnsMode::Disabled);
    settings.set_network_types(vec![NetworkType::Udp4, NetworkType::Udp6]);
    settings.set_include_loopback_candidate(config.include_loopback);

    let bind = config.bind_address;
    if !bind.is_unspecified() {
        settings.set_ip_filter(Box::new(move |ip| ip == bind));
    }
    settings
}

impl NegotiationEngine {
    /// Create an engine around a fresh peer connection
    pub async fn new(config: EngineConfig) -> Result<Self> {
        let mut media = codecs::media_engine(&config)?;
        let registry = register_default_interceptors(Registry::new(), &mut media)?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine(&config))
            .build();

        let peer = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers: ice_servers(&config),
                ..Default::default()
            })
            .await?,
        );

        let (state_tx, connection) = watch::channel(ConnectionState::New);
        peer.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            info!("Peer connection {}", state);
            let _ = state_tx.send(state);
            Box::pin(async {})
        }));
        peer.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            debug!("Remote {} media flowing (ssrc {})", track.kind(), track.ssrc());
            Box::pin(async {})
        }));

        debug!("Negotiation engine created");
        Ok(Self {
            config,
            state: NegotiationState::Fresh,
            stream_id: uuid::Uuid::new_v4().simple().to_string(),
            peer,
            connection,
            local_tracks: Vec::new(),
            remote_tracks: Vec::new(),
            gathering: None,
            local_description: None,
            on_remote_track: None,
        })
    }

    /// Register the handler for remote tracks, replacing any previous one
    pub fn on_remote_track<F>(&mut self, handler: F)
    where
        F: Fn(RemoteTrack) + Send + Sync + 'static,
    {
        self.on_remote_track = Some(Arc::new(handler));
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn local_tracks(&self) -> &[LocalTrack] {
        &self.local_tracks
    }

    /// Tracks announced by the applied remote offer
    pub fn remote_tracks(&self) -> &[RemoteTrack] {
        &self.remote_tracks
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Attach a track to send; only before the remote offer is applied
    pub async fn add_outgoing_track(&mut self, mut track: LocalTrack) -> Result<()> {
        match self.state {
            NegotiationState::Fresh | NegotiationState::HasOutgoingTracks => {}
            state => return Err(Error::invalid_state("add an outgoing track", state)),
        }
        let capability = codecs::outgoing_capability(&self.config, track.kind)
            .ok_or_else(|| Error::Incompatible(format!("no {} codec configured", track.kind)))?;
        if track.stream_id.is_empty() {
            track.stream_id = self.stream_id.clone();
        }

        let local = Arc::new(TrackLocalStaticSample::new(
            capability,
            track.id.clone(),
            track.stream_id.clone(),
        ));
        let sender = self
            .peer
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // RTCP has to be drained for NACK and PLI handling to run
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });

        debug!("Outgoing {} track {} ({})", track.kind, track.id, track.label);
        self.local_tracks.push(track);
        self.state = NegotiationState::HasOutgoingTracks;
        Ok(())
    }

    /// Apply the remote offer
    ///
    /// A description that fails to parse or validate leaves the engine
    /// unchanged. On success every announced remote track is handed to the
    /// registered handler.
    pub async fn set_remote_offer(&mut self, offer: &RtcSessionDescription) -> Result<()> {
        match self.state {
            NegotiationState::Fresh | NegotiationState::HasOutgoingTracks => {}
            state => return Err(Error::invalid_state("apply a remote offer", state)),
        }
        if offer.kind != SdpType::Offer {
            return Err(Error::malformed(format!("expected an offer, got {}", offer.kind)));
        }

        let summary = inspect_offer(&parse_sdp(&offer.sdp)?, &self.config)?;
        let description = RTCSessionDescription::offer(offer.sdp.clone()).map_err(|e| Error::malformed(e.to_string()))?;
        self.peer
            .set_remote_description(description)
            .await
            .map_err(|e| Error::malformed(e.to_string()))?;

        self.remote_tracks = summary.remote_tracks;
        self.state = NegotiationState::HasRemoteOffer;
        debug!("Remote offer applied with {} remote track(s)", self.remote_tracks.len());

        for track in &self.remote_tracks {
            match &self.on_remote_track {
                Some(handler) => handler(track.clone()),
                None => debug!("No handler for remote {} track {}", track.kind, track.mid),
            }
        }
        Ok(())
    }

    /// Create the answer and start gathering candidates for it
    ///
    /// The returned description carries no candidates yet; use
    /// [`local_description`](Self::local_description) for the one to send.
    pub async fn create_answer(&mut self) -> Result<RtcSessionDescription> {
        if self.state != NegotiationState::HasRemoteOffer {
            return Err(Error::invalid_state("create an answer", self.state));
        }

        let answer = self.peer.create_answer(None).await?;
        let gathering = self.peer.gathering_complete_promise().await;
        self.peer.set_local_description(answer.clone()).await?;
        debug!("Local answer set, gathering candidates");

        self.gathering = Some(gathering);
        self.state = NegotiationState::HasLocalAnswer;
        Ok(RtcSessionDescription::answer(answer.sdp))
    }

    /// Final answer including gathered candidates
    ///
    /// Waits for gathering to finish, at most for the configured gathering
    /// timeout, on first use; later calls return the same description.
    pub async fn local_description(&mut self) -> Result<RtcSessionDescription> {
        if self.state != NegotiationState::HasLocalAnswer {
            return Err(Error::invalid_state("read the local description", self.state));
        }
        if let Some(description) = &self.local_description {
            return Ok(description.clone());
        }

        if let Some(mut gathering) = self.gathering.take() {
            let limit = self.config.gathering_timeout();
            if tokio::time::timeout(limit, gathering.recv()).await.is_err() {
                warn!("Candidate gathering still running after {:?}, answering with what we have", limit);
            }
        }

        let local = self
            .peer
            .local_description()
            .await
            .ok_or_else(|| Error::invalid_state("read the local description", self.state))?;
        let candidates = local.sdp.lines().filter(|l| l.starts_with("a=candidate:")).count();
        info!("Local description ready with {} candidate(s)", candidates);

        let description = RtcSessionDescription::answer(local.sdp);
        self.local_description = Some(description.clone());
        Ok(description)
    }

    /// Wait until ICE and DTLS have completed
    pub async fn wait_connected(&mut self, timeout: Duration) -> Result<()> {
        let connected = async {
            loop {
                let state = *self.connection.borrow_and_update();
                match state {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Failed | ConnectionState::Closed => {
                        return Err(Error::Connection(format!("peer connection {}", state)))
                    }
                    _ => {}
                }
                if self.connection.changed().await.is_err() {
                    return Err(Error::Connection("peer connection dropped".to_string()));
                }
            }
        };
        tokio::time::timeout(timeout, connected)
            .await
            .map_err(|_| Error::Connection(format!("not connected after {:?}", timeout)))?
    }

    /// Tear down the peer connection
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.gathering = None;
        self.on_remote_track = None;
        if let Err(e) = self.peer.close().await {
            warn!("Error while closing peer connection: {}", e);
        }
        debug!("Negotiation engine closed (was {})", self.state);
        self.state = NegotiationState::Closed;
    }
}

impl Drop for NegotiationEngine {
    fn drop(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        warn!("Negotiation engine dropped without close");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let peer = self.peer.clone();
                runtime.spawn(async move {
                    if let Err(e) = peer.close().await {
                        warn!("Error while closing peer connection: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime left to close the peer connection"),
        }
    }
}

impl fmt::Debug for NegotiationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiationEngine")
            .field("state", &self.state)
            .field("connection", &self.connection_state())
            .field("local_tracks", &self.local_tracks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stun_servers_get_a_scheme() {
        let mut config = EngineConfig::default();
        config.stun_servers = vec!["stun.example.org:3478".into(), "stun:10.0.0.1:3478".into()];
        let servers = ice_servers(&config);
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].urls, vec!["stun:stun.example.org:3478", "stun:10.0.0.1:3478"]);

        config.stun_servers.clear();
        assert!(ice_servers(&config).is_empty());
    }

    #[tokio::test]
    async fn new_engine_is_fresh_and_unconnected() {
        let mut engine = NegotiationEngine::new(EngineConfig::local()).await.unwrap();
        assert_eq!(engine.state(), NegotiationState::Fresh);
        assert_eq!(engine.connection_state(), ConnectionState::New);
        assert!(engine.remote_tracks().is_empty());
        engine.close().await;
    }
}
