//! Process configuration: defaults, TOML file, `DOORBELL__*` environment, CLI

use std::path::Path;

use doorbell_infra_common::{load_config, parse_log_level, ConfigSource, LoggingConfig};
use doorbell_negotiation::EngineConfig;
use doorbell_session::{MediaConfig, NotifyConfig, SessionConfig};
use doorbell_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "DOORBELL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
    pub file_info: bool,
    pub spans: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
            spans: false,
        }
    }
}

impl LogSettings {
    pub fn to_logging_config(&self) -> doorbell_infra_common::Result<LoggingConfig> {
        let config = LoggingConfig::new(parse_log_level(&self.level)?)
            .with_file_info(self.file_info)
            .with_spans(self.spans);
        Ok(if self.json { config.json() } else { config })
    }
}

/// Everything the doorbell process needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorbellConfig {
    pub signaling: SignalingConfig,
    pub session: SessionConfig,
    pub negotiation: EngineConfig,
    pub media: MediaConfig,
    pub notify: NotifyConfig,
    pub logging: LogSettings,
}

/// Command line values that win over every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

impl DoorbellConfig {
    /// Defaults, then `file` if given, then the environment
    pub fn load(file: Option<&Path>) -> doorbell_infra_common::Result<Self> {
        let sources: Vec<ConfigSource> = file.map(|p| ConfigSource::File(p.to_path_buf())).into_iter().collect();
        load_config(&sources, Some(ENV_PREFIX))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(endpoint) = overrides.endpoint {
            self.signaling.endpoint = endpoint;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.session.step_timeout_secs = timeout;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if overrides.json_logs {
            self.logging.json = true;
        }
    }
}
