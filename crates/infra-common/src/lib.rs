//! Common infrastructure for the doorbell call stack
//!
//! Shared by every crate in the workspace:
//!
//! - **logging**: `tracing-subscriber` setup driven by [`LoggingConfig`]
//! - **config**: layered configuration loading (defaults, TOML file, environment)
//! - **errors**: the infrastructure error type

pub mod config;
pub mod errors;
pub mod logging;

pub use config::{load_config, ConfigSource};
pub use errors::{Error, Result};
pub use logging::{log_welcome, parse_log_level, setup_logging, LogFormat, LoggingConfig};
