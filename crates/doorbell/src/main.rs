//! Doorbell process: one WebRTC call per button press

mod config;
mod trigger;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use doorbell_infra_common::{log_welcome, setup_logging};
use doorbell_session::{
    CallEventHandler, CallReport, CallSessionStateMachine, CallState, ConfiguredDevices, ConsoleNotifier,
};
use doorbell_signaling::{RoomIdentifier, WebSocketSignalingChannel};
use tracing::{debug, info};

use crate::config::{DoorbellConfig, Overrides};
use crate::trigger::LineTrigger;

#[derive(Parser, Debug)]
#[command(name = "doorbell", version, about = "Ring a WebRTC video call through a signaling server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Signaling server, e.g. https://10.0.0.5:443
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Seconds to wait at each signaling step
    #[arg(short, long)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout_secs,
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
        }
    }
}

/// Traces transitions and call timing; outcomes are logged by the state machine
struct CallLogger;

#[async_trait]
impl CallEventHandler for CallLogger {
    async fn on_call_state_changed(&self, room: &RoomIdentifier, from: CallState, to: CallState) {
        debug!(%room, "{} -> {}", from, to);
    }

    async fn on_call_ended(&self, report: &CallReport) {
        debug!(
            room = %report.room,
            duration = ?report.duration,
            states = report.states.len(),
            "Call report"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DoorbellConfig::load(args.config.as_deref()).context("loading configuration")?;
    config.apply(args.overrides());

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    setup_logging(config.logging.to_logging_config()?)?;
    log_welcome("doorbell", env!("CARGO_PKG_VERSION"));
    info!(endpoint = %config.signaling.endpoint, "Using signaling server");

    let channel = WebSocketSignalingChannel::new(config.signaling.clone());
    let mut machine = CallSessionStateMachine::new(
        config.session.clone(),
        config.signaling.endpoint.clone(),
        Box::new(channel),
        Box::new(LineTrigger::stdin()),
        Arc::new(ConsoleNotifier::new(config.notify.clone())),
        Arc::new(ConfiguredDevices::new(config.media.clone())),
    )
    .with_engine_config(config.negotiation.clone())
    .with_event_handler(Arc::new(CallLogger));

    println!("Press Enter to ring the doorbell, Ctrl-D to quit");

    tokio::select! {
        result = machine.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    Ok(())
}
