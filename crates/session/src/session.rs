//! Resources owned by one call attempt

use std::sync::Arc;
use std::time::Duration;

use doorbell_negotiation::NegotiationEngine;
use doorbell_signaling::{EventQueue, EventSender, QueueError, RoomIdentifier, SignalingEvent};
use tokio::time::Instant;
use tracing::debug;

use crate::media::{MediaBridge, MediaSink, MediaSource};
use crate::state::CallState;

/// State of the single live call
///
/// Each attempt gets a fresh queue, so events addressed to an abandoned
/// call can never reach the next one. The engine and media bindings are
/// released by [`release`](Self::release) or, failing that, on drop.
pub struct CallSession {
    room: RoomIdentifier,
    queue: EventQueue,
    engine: Option<NegotiationEngine>,
    media: MediaBridge,
    states: Vec<CallState>,
    started: Instant,
}

impl CallSession {
    pub fn new(room: RoomIdentifier) -> Self {
        Self {
            room,
            queue: EventQueue::new(),
            engine: None,
            media: MediaBridge::new(),
            states: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn room(&self) -> &RoomIdentifier {
        &self.room
    }

    /// Producer side of this call's queue, handed to the signaling channel
    pub fn events(&self) -> EventSender {
        self.queue.sender()
    }

    pub async fn next_event(&mut self, timeout: Duration) -> Result<SignalingEvent, QueueError> {
        self.queue.pop(timeout).await
    }

    /// Take ownership of `engine` and wire the call's devices to it
    pub async fn prepare_peer(
        &mut self,
        mut engine: NegotiationEngine,
        sources: Vec<Box<dyn MediaSource>>,
        sink: Arc<dyn MediaSink>,
    ) -> Result<(), doorbell_negotiation::Error> {
        self.media.bind_sink(&mut engine, sink);
        let mut attached = Ok(());
        for source in sources {
            if let Err(e) = self.media.attach_source(&mut engine, source).await {
                attached = Err(e);
                break;
            }
        }
        self.engine = Some(engine);
        attached
    }

    pub fn engine_mut(&mut self) -> Option<&mut NegotiationEngine> {
        self.engine.as_mut()
    }

    pub(crate) fn record(&mut self, state: CallState) {
        self.states.push(state);
    }

    pub fn states(&self) -> &[CallState] {
        &self.states
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Close the engine and give back every device; idempotent
    pub async fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.close().await;
        }
        self.media.release();
        debug!("Call resources for room {} released", self.room);
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if self.engine.take().is_some() {
            self.media.release();
        }
    }
}
