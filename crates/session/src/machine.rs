//! The call state machine
//!
//! ```text
//! AwaitTrigger → JoinRoom → NotifyUser → AwaitPeer → PreparePeer
//!              → AwaitInvite → Negotiate → [AwaitBye] → Cleanup → AwaitTrigger
//! ```
//!
//! Every wait point pops the call's queue with the same timeout. A timeout
//! or an event of the wrong kind aborts the attempt; whatever happens,
//! Cleanup disconnects signaling once and releases the engine and devices.

use std::sync::Arc;
use std::time::Duration;

use doorbell_negotiation::{EngineConfig, NegotiationEngine, RtcSessionDescription};
use doorbell_signaling::{EventKind, QueueError, RoomIdentifier, SignalingChannel, SignalingEvent};
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::media::MediaDevices;
use crate::notify::Notifier;
use crate::session::CallSession;
use crate::state::{CallEventHandler, CallOutcome, CallReport, CallState};
use crate::trigger::Trigger;

/// Failure of a call attempt and the state it happened in
struct Abort {
    state: CallState,
    error: SessionError,
}

type Step<T = ()> = std::result::Result<T, Abort>;

trait AbortIn<T> {
    fn abort_in(self, state: CallState) -> Step<T>;
}

impl<T, E: Into<SessionError>> AbortIn<T> for std::result::Result<T, E> {
    fn abort_in(self, state: CallState) -> Step<T> {
        self.map_err(|e| Abort {
            state,
            error: e.into(),
        })
    }
}

/// Drives one call per trigger, forever or until the trigger is exhausted
pub struct CallSessionStateMachine {
    config: SessionConfig,
    engine_config: EngineConfig,
    endpoint: String,
    channel: Box<dyn SignalingChannel>,
    trigger: Box<dyn Trigger>,
    notifier: Arc<dyn Notifier>,
    devices: Arc<dyn MediaDevices>,
    room_ids: Box<dyn FnMut() -> RoomIdentifier + Send>,
    handler: Option<Arc<dyn CallEventHandler>>,
}

impl CallSessionStateMachine {
    pub fn new(
        config: SessionConfig,
        endpoint: impl Into<String>,
        channel: Box<dyn SignalingChannel>,
        trigger: Box<dyn Trigger>,
        notifier: Arc<dyn Notifier>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        Self {
            config,
            engine_config: EngineConfig::default(),
            endpoint: endpoint.into(),
            channel,
            trigger,
            notifier,
            devices,
            room_ids: Box::new(RoomIdentifier::generate),
            handler: None,
        }
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Replace the random room id generator
    pub fn with_room_ids<F>(mut self, room_ids: F) -> Self
    where
        F: FnMut() -> RoomIdentifier + Send + 'static,
    {
        self.room_ids = Box::new(room_ids);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn CallEventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Outer loop: wait for the trigger, run a call, repeat
    ///
    /// Returns when the trigger source is exhausted or fails. Failed calls
    /// never end the loop.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            debug!("Waiting for trigger");
            if !self.trigger.fired().await? {
                info!("Trigger source closed, stopping");
                return Ok(());
            }
            self.run_call().await;
        }
    }

    /// One call attempt from JoinRoom through Cleanup
    pub async fn run_call(&mut self) -> CallReport {
        let room = (self.room_ids)();
        let span = info_span!("call", room = %room);
        self.run_session(CallSession::new(room)).instrument(span).await
    }

    async fn run_session(&mut self, mut session: CallSession) -> CallReport {
        let outcome = match self.drive(&mut session).await {
            Ok(()) => {
                info!("Call completed");
                CallOutcome::Completed
            }
            Err(Abort { state, error }) => {
                if error.is_no_show() {
                    warn!("Call aborted in {}: {}", state, error);
                } else {
                    error!("Call aborted in {}: {}", state, error);
                }
                CallOutcome::Aborted {
                    state,
                    error: Arc::new(error),
                }
            }
        };

        self.cleanup(&mut session).await;

        let report = CallReport {
            room: session.room().clone(),
            outcome,
            states: session.states().to_vec(),
            duration: session.elapsed(),
        };
        if let Some(handler) = &self.handler {
            handler.on_call_ended(&report).await;
        }
        report
    }

    async fn drive(&mut self, session: &mut CallSession) -> Step {
        let timeout = self.config.step_timeout();

        self.enter(session, CallState::JoinRoom).await;
        self.channel
            .connect(&self.endpoint, session.events())
            .await
            .abort_in(CallState::JoinRoom)?;
        self.channel.join(session.room()).await.abort_in(CallState::JoinRoom)?;
        expect(session, CallState::JoinRoom, EventKind::Created, timeout).await?;

        self.enter(session, CallState::NotifyUser).await;
        if let Err(e) = self.notifier.notify(session.room()).await {
            warn!("Notification failed, still waiting for a peer: {}", e);
        }

        self.enter(session, CallState::AwaitPeer).await;
        if let Err(abort) = expect(session, CallState::AwaitPeer, EventKind::NewPeer, timeout).await {
            self.send_bye(session).await;
            return Err(abort);
        }

        self.enter(session, CallState::PreparePeer).await;
        self.prepare_peer(session).await?;

        self.enter(session, CallState::AwaitInvite).await;
        let invite = expect(session, CallState::AwaitInvite, EventKind::Invite, timeout).await?;

        self.enter(session, CallState::Negotiate).await;
        let answer = negotiate(session, invite.payload()).await.abort_in(CallState::Negotiate)?;
        self.channel
            .send(EventKind::Ok, answer.to_value())
            .await
            .abort_in(CallState::Negotiate)?;
        info!("Answer sent");

        if let Some(hangup) = self.config.hangup_timeout() {
            self.enter(session, CallState::AwaitBye).await;
            let result = self.await_bye(session, hangup).await;
            self.send_bye(session).await;
            result?;
        }
        Ok(())
    }

    async fn prepare_peer(&mut self, session: &mut CallSession) -> Step {
        let state = CallState::PreparePeer;
        let sources = self.devices.open_sources().await.abort_in(state)?;
        let sink = self.devices.open_sink().await.abort_in(state)?;
        let engine = NegotiationEngine::new(self.engine_config.clone()).await.abort_in(state)?;
        session.prepare_peer(engine, sources, sink).await.abort_in(state)
    }

    /// `bye` or the maximum call length ends the call normally
    async fn await_bye(&mut self, session: &mut CallSession, hangup: Duration) -> Step {
        match session.next_event(hangup).await {
            Ok(event) if event.kind() == &EventKind::Bye => {
                info!("Peer hung up");
                Ok(())
            }
            Ok(event) => Err(Abort {
                state: CallState::AwaitBye,
                error: SessionError::UnexpectedEventKind {
                    state: CallState::AwaitBye,
                    expected: EventKind::Bye,
                    received: event.kind().clone(),
                },
            }),
            Err(QueueError::TimedOut(after)) => {
                info!("Maximum call length of {:?} reached", after);
                Ok(())
            }
        }
    }

    async fn send_bye(&mut self, session: &CallSession) {
        let room = Value::from(session.room());
        if let Err(e) = self.channel.send(EventKind::Bye, room).await {
            warn!("Could not send bye: {}", e);
        }
    }

    async fn cleanup(&mut self, session: &mut CallSession) {
        self.enter(session, CallState::Cleanup).await;
        if let Err(e) = self.channel.disconnect().await {
            warn!("Error while disconnecting: {}", e);
        }
        session.release().await;
        if let Some(handler) = &self.handler {
            handler
                .on_call_state_changed(session.room(), CallState::Cleanup, CallState::AwaitTrigger)
                .await;
        }
    }

    async fn enter(&self, session: &mut CallSession, state: CallState) {
        let from = session.states().last().copied().unwrap_or(CallState::AwaitTrigger);
        debug!("{} -> {}", from, state);
        session.record(state);
        if let Some(handler) = &self.handler {
            handler.on_call_state_changed(session.room(), from, state).await;
        }
    }
}

/// Pop the next event and require it to be of `expected` kind
async fn expect(
    session: &mut CallSession,
    state: CallState,
    expected: EventKind,
    timeout: Duration,
) -> Step<SignalingEvent> {
    let event = session.next_event(timeout).await.map_err(|QueueError::TimedOut(after)| Abort {
        state,
        error: SessionError::TimedOut { state, after },
    })?;

    if event.kind() != &expected {
        return Err(Abort {
            state,
            error: SessionError::UnexpectedEventKind {
                state,
                expected,
                received: event.kind().clone(),
            },
        });
    }
    debug!("Received expected {}", expected);
    Ok(event)
}

async fn negotiate(session: &mut CallSession, payload: &Value) -> Result<RtcSessionDescription> {
    let offer = RtcSessionDescription::from_value(payload)?;
    let engine = session
        .engine_mut()
        .ok_or_else(|| SessionError::Negotiation(doorbell_negotiation::Error::malformed("no peer prepared")))?;
    engine.set_remote_offer(&offer).await?;
    engine.create_answer().await?;
    Ok(engine.local_description().await?)
}
