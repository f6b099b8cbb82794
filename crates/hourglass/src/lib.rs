//! Hourglass CLI: calendar windows, date-math names and completion waits.
//!
//! This crate handles:
//! - Loading the YAML configuration with environment interpolation
//! - Talking to the cluster's REST API
//! - Dispatching subcommands to `hourglass-core`

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod telemetry;

// Re-export commonly used items
pub use app::run;
pub use cli::CliArgs;
pub use config::Config;
pub use error::{CliError, ConfigError, MetricsError};
pub use http::HttpClusterClient;
pub use telemetry::{init_metrics, init_tracing};
