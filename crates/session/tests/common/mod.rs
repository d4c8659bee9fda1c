//! Test doubles for the call state machine

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use doorbell_negotiation::{EngineConfig, MediaKind, RemoteTrack};
use doorbell_session::prelude::*;
use doorbell_session::MediaError;
use doorbell_signaling::{EventKind, EventSender, RoomIdentifier, SignalingChannel, SignalingEvent};

pub const OFFER_SDP: &str = "v=0\r\n\
o=- 5120412387693447221 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
a=ice-ufrag:Fk3q\r\n\
a=ice-pwd:b3rEz8lUWd9kw4yZ7JQ6cE1P\r\n\
a=fingerprint:sha-256 4B:0C:7B:E7:1D:9A:11:0E:26:6F:8D:CF:7E:59:C8:17:8E:22:0A:52:6D:71:2C:8D:D2:D6:19:5E:1A:2B:4C:36\r\n\
a=setup:actpass\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=msid:visitor mic\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=recvonly\r\n\
a=rtcp-mux\r\n\
a=rtpmap:96 VP8/90000\r\n";

pub fn offer_payload() -> Value {
    json!({"type": "offer", "sdp": OFFER_SDP})
}

pub fn event(kind: &str, payload: Value) -> SignalingEvent {
    SignalingEvent::new(kind, payload)
}

/// What the fake server saw
#[derive(Debug, Default)]
pub struct ChannelLog {
    pub connects: usize,
    pub sent: Vec<(EventKind, Value)>,
    pub disconnects: usize,
}

impl ChannelLog {
    pub fn count(&self, kind: &EventKind) -> usize {
        self.sent.iter().filter(|(k, _)| k == kind).count()
    }

    pub fn payloads(&self, kind: &EventKind) -> Vec<Value> {
        self.sent
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// Signaling channel that replays scripted server messages
///
/// `on_join` is delivered when the client sends `join`, `on_ok` when it
/// sends `ok`. The script is replayed for every call.
#[derive(Clone, Default)]
pub struct MockChannel {
    pub log: Arc<Mutex<ChannelLog>>,
    pub on_join: Vec<SignalingEvent>,
    pub on_ok: Vec<SignalingEvent>,
    pub fail_connect: bool,
    pub events: Option<EventSender>,
    pub connected: bool,
}

impl MockChannel {
    pub fn scripted(on_join: Vec<SignalingEvent>) -> Self {
        Self {
            on_join,
            ..Default::default()
        }
    }

    pub fn with_on_ok(mut self, on_ok: Vec<SignalingEvent>) -> Self {
        self.on_ok = on_ok;
        self
    }
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn connect(&mut self, _endpoint: &str, events: EventSender) -> doorbell_signaling::Result<()> {
        self.log.lock().unwrap().connects += 1;
        if self.fail_connect {
            return Err(doorbell_signaling::Error::Connection("refused".into()));
        }
        self.events = Some(events);
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, kind: EventKind, payload: Value) -> doorbell_signaling::Result<()> {
        if !self.connected {
            return Err(doorbell_signaling::Error::NotConnected);
        }
        self.log.lock().unwrap().sent.push((kind.clone(), payload));

        let replies = match kind {
            EventKind::Join => self.on_join.clone(),
            EventKind::Ok => self.on_ok.clone(),
            _ => Vec::new(),
        };
        if let Some(events) = &self.events {
            for reply in replies {
                events.push(reply);
            }
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> doorbell_signaling::Result<()> {
        self.log.lock().unwrap().disconnects += 1;
        self.events = None;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

struct FakeSource {
    kind: MediaKind,
    released: Arc<AtomicUsize>,
}

impl MediaSource for FakeSource {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn label(&self) -> &str {
        "fake"
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeSink {
    pub tracks: Mutex<Vec<RemoteTrack>>,
    pub released: AtomicUsize,
}

impl MediaSink for FakeSink {
    fn attach(&self, track: &RemoteTrack) -> Result<(), MediaError> {
        self.tracks.lock().unwrap().push(track.clone());
        Ok(())
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Camera + microphone that count opens and releases
#[derive(Default)]
pub struct FakeDevices {
    pub unavailable: bool,
    pub opened: AtomicUsize,
    pub released: Arc<AtomicUsize>,
    pub sink: Arc<FakeSink>,
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn open_sources(&self) -> Result<Vec<Box<dyn MediaSource>>, MediaError> {
        if self.unavailable {
            return Err(MediaError::unavailable("/dev/video0", "no such device"));
        }
        self.opened.fetch_add(2, Ordering::SeqCst);
        let sources: Vec<Box<dyn MediaSource>> = vec![
            Box::new(FakeSource {
                kind: MediaKind::Video,
                released: self.released.clone(),
            }),
            Box::new(FakeSource {
                kind: MediaKind::Audio,
                released: self.released.clone(),
            }),
        ];
        Ok(sources)
    }

    async fn open_sink(&self) -> Result<Arc<dyn MediaSink>, MediaError> {
        let sink: Arc<dyn MediaSink> = self.sink.clone();
        Ok(sink)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub rooms: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, room: &RoomIdentifier) -> doorbell_session::Result<()> {
        self.rooms.lock().unwrap().push(room.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    pub transitions: Mutex<Vec<(CallState, CallState)>>,
    pub reports: Mutex<Vec<CallReport>>,
}

#[async_trait]
impl CallEventHandler for RecordingHandler {
    async fn on_call_state_changed(&self, _room: &RoomIdentifier, from: CallState, to: CallState) {
        self.transitions.lock().unwrap().push((from, to));
    }

    async fn on_call_ended(&self, report: &CallReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Everything a test needs to inspect after running the machine
pub struct Harness {
    pub log: Arc<Mutex<ChannelLog>>,
    pub devices: Arc<FakeDevices>,
    pub notifier: Arc<RecordingNotifier>,
    pub handler: Arc<RecordingHandler>,
    pub machine: CallSessionStateMachine,
}

pub fn harness(channel: MockChannel, devices: FakeDevices, config: SessionConfig, room: &str) -> Harness {
    harness_with_trigger(channel, devices, config, room, Box::new(ChannelTrigger::new(1).0))
}

pub fn harness_with_trigger(
    channel: MockChannel,
    devices: FakeDevices,
    config: SessionConfig,
    room: &str,
    trigger: Box<dyn Trigger>,
) -> Harness {
    let log = channel.log.clone();
    let devices = Arc::new(devices);
    let notifier = Arc::new(RecordingNotifier::default());
    let handler = Arc::new(RecordingHandler::default());
    let room = room.to_string();

    let machine = CallSessionStateMachine::new(
        config,
        "http://signaling.test",
        Box::new(channel),
        trigger,
        notifier.clone(),
        devices.clone(),
    )
    .with_engine_config(EngineConfig::local())
    .with_room_ids(move || RoomIdentifier::new(room.clone()))
    .with_event_handler(handler.clone());

    Harness {
        log,
        devices,
        notifier,
        handler,
        machine,
    }
}

pub fn no_hangup() -> SessionConfig {
    SessionConfig {
        hangup_timeout_secs: None,
        ..Default::default()
    }
}
