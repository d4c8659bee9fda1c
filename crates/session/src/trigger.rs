//! External trigger (the doorbell button)

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Source of "someone rang" signals
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next press; `Ok(false)` means the source is exhausted
    async fn fired(&mut self) -> Result<bool>;
}

/// Trigger fed through a channel, one message per press
pub struct ChannelTrigger {
    presses: mpsc::Receiver<()>,
}

impl ChannelTrigger {
    /// Returns the trigger and the handle used to press it
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { presses: rx }, tx)
    }
}

#[async_trait]
impl Trigger for ChannelTrigger {
    async fn fired(&mut self) -> Result<bool> {
        Ok(self.presses.recv().await.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_per_press_then_reports_exhaustion() {
        let (mut trigger, press) = ChannelTrigger::new(4);
        press.send(()).await.unwrap();
        press.send(()).await.unwrap();
        drop(press);

        assert!(trigger.fired().await.unwrap());
        assert!(trigger.fired().await.unwrap());
        assert!(!trigger.fired().await.unwrap());
    }
}
