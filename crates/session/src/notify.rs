//! Telling the resident which room to open

use async_trait::async_trait;
use doorbell_signaling::RoomIdentifier;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Delivers the room of a ringing call to the resident
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, room: &RoomIdentifier) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Link shown to the resident; `{room}` is replaced by the room id,
    /// e.g. `https://doorbell.local/?roomId={room}`
    pub viewer_url_template: Option<String>,
}

/// Text to show for `room`: the rendered template, or the bare room id
pub fn viewer_link(template: Option<&str>, room: &RoomIdentifier) -> String {
    match template {
        Some(template) => template.replace("{room}", room.as_str()),
        None => room.to_string(),
    }
}

/// Prints the viewer link on stdout
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    config: NotifyConfig,
}

impl ConsoleNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, room: &RoomIdentifier) -> Result<()> {
        let link = viewer_link(self.config.viewer_url_template.as_deref(), room);
        info!("Doorbell rang, viewer link {}", link);
        println!("Someone is at the door: {}", link);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_template_or_room() {
        let room = RoomIdentifier::new("abc-123");
        assert_eq!(
            viewer_link(Some("https://bell.local/?roomId={room}"), &room),
            "https://bell.local/?roomId=abc-123"
        );
        assert_eq!(viewer_link(None, &room), "abc-123");
    }
}
