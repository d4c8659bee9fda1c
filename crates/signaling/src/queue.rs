//! Inbound event queue
//!
//! The queue is the only hand-off point between the signaling receive loop
//! (producer) and the call state machine (consumer). Pushing never blocks
//! and never drops while the queue is alive; popping waits up to a timeout.
//! A new queue is created for every call attempt so events of an abandoned
//! call cannot reach the next one: their sender simply finds the old queue
//! gone.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use crate::event::SignalingEvent;

/// Errors returned by [`EventQueue::pop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No event arrived before the deadline
    #[error("No signaling event within {0:?}")]
    TimedOut(Duration),
}

/// Producer handle for an [`EventQueue`]
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SignalingEvent>,
}

impl EventSender {
    /// Enqueue an event at the tail.
    ///
    /// Returns `false` when the queue has been discarded, in which case the
    /// event is dropped.
    pub fn push(&self, event: SignalingEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                trace!("Discarding {} event for a retired queue", event.kind());
                false
            }
        }
    }

    /// Whether the consuming queue is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Unbounded FIFO of inbound signaling events
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<SignalingEvent>,
    rx: mpsc::UnboundedReceiver<SignalingEvent>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Producer handle to give to the receive loop
    pub fn sender(&self) -> EventSender {
        EventSender { tx: self.tx.clone() }
    }

    /// Enqueue an event at the tail
    pub fn push(&self, event: SignalingEvent) {
        // The queue owns a sender and a receiver, so this cannot fail.
        let _ = self.tx.send(event);
    }

    /// Remove the head of the queue, waiting at most `timeout` for one
    pub async fn pop(&mut self, timeout: Duration) -> Result<SignalingEvent, QueueError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => Ok(event),
            // `self.tx` keeps the channel open, so `None` is never observed.
            Ok(None) | Err(_) => Err(QueueError::TimedOut(timeout)),
        }
    }

    /// Remove the head of the queue if one is ready
    pub fn try_pop(&mut self) -> Option<SignalingEvent> {
        self.rx.try_recv().ok()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use serde_json::json;
    use tokio::time::Instant;

    #[tokio::test]
    async fn pops_in_push_order() {
        let mut queue = EventQueue::new();
        let sender = queue.sender();
        queue.push(SignalingEvent::new("created", json!("hall")));
        assert!(sender.push(SignalingEvent::bare("new_peer")));
        assert!(sender.push(SignalingEvent::new("invite", json!({"type": "offer"}))));

        let timeout = Duration::from_secs(1);
        assert_eq!(queue.pop(timeout).await.unwrap().kind(), &EventKind::Created);
        assert_eq!(queue.pop(timeout).await.unwrap().kind(), &EventKind::NewPeer);
        assert_eq!(queue.pop(timeout).await.unwrap().kind(), &EventKind::Invite);
        assert!(queue.try_pop().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pop_times_out_after_deadline() {
        let mut queue = EventQueue::new();
        let timeout = Duration::from_secs(10);
        let started = Instant::now();

        let err = queue.pop(timeout).await.unwrap_err();

        assert_eq!(err, QueueError::TimedOut(timeout));
        let waited = started.elapsed();
        assert!(waited >= timeout);
        assert!(waited < timeout + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn pop_wakes_when_event_arrives() {
        let mut queue = EventQueue::new();
        let sender = queue.sender();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            sender.push(SignalingEvent::bare("bye"));
        });

        let event = queue.pop(Duration::from_secs(10)).await.unwrap();
        assert_eq!(event.kind(), &EventKind::Bye);
    }

    #[test]
    fn sender_of_dropped_queue_discards() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(sender.is_closed());
        assert!(!sender.push(SignalingEvent::bare("bye")));
    }
}
