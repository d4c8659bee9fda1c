use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::types::{Error, Result};

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Plain,
    /// One JSON object per event on stdout
    Json,
}

/// How the process logs
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Floor for every target; `RUST_LOG` directives are added on top
    pub level: Level,
    pub format: LogFormat,
    /// Include source file and line
    pub file_info: bool,
    /// Emit an event when a span (e.g. one call attempt) opens and closes
    pub spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            format: LogFormat::Plain,
            file_info: false,
            spans: false,
        }
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn with_file_info(mut self, enabled: bool) -> Self {
        self.file_info = enabled;
        self
    }

    pub fn with_spans(mut self, enabled: bool) -> Self {
        self.spans = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::from_default_env().add_directive(self.level.into())
    }
}

/// Install the global subscriber.
///
/// Fails if one is already installed.
pub fn setup_logging(config: LoggingConfig) -> Result<()> {
    let span_events = if config.spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(config.filter())
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = match config.format {
        LogFormat::Json => builder.json().with_writer(std::io::stdout).try_init(),
        LogFormat::Plain => builder.try_init(),
    };
    installed.map_err(|e| Error::Logging(e.to_string()))
}

/// `"debug"`, `" WARN "`, ... into a [`Level`]
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| Error::Config(format!("unknown log level '{}'", level)))
}

/// First line every binary logs
pub fn log_welcome(app_name: &str, version: &str) {
    tracing::info!(version, "{} starting", app_name);
}
