//! Error types for configuration, metrics setup and command execution.

use std::path::PathBuf;
use std::process::ExitCode;

use snafu::prelude::*;

/// Exit code used when a wait runs out of time.
pub const TIMEOUT_EXIT_CODE: u8 = 2;

// ============ Config Errors ============

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// A value parsed but is not acceptable.
    #[snafu(display("Invalid value for '{field}': {message}"))]
    InvalidValue { field: String, message: String },

    /// The HTTP client could not be built.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    HttpClient { source: reqwest::Error },
}

// ============ Metrics Errors ============

/// Errors that can occur while starting the metrics exporter.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// The listen address is not a socket address.
    #[snafu(display("Invalid metrics address '{address}': {source}"))]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to install the Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus exporter: {source}"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ CLI Errors ============

/// Errors surfaced by a CLI command.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CliError {
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    #[snafu(display("{source}"))]
    Metrics { source: MetricsError },

    #[snafu(display("{source}"))]
    Core { source: hourglass_core::Error },

    /// No date in the expected shape was found in a name.
    #[snafu(display("No date matching timestring '{timestring}' found in '{name}'"))]
    NoDateFound { name: String, timestring: String },
}

impl CliError {
    /// Numeric exit status: [`TIMEOUT_EXIT_CODE`] for wait timeouts, 1 otherwise.
    pub fn exit_status(&self) -> u8 {
        match self {
            CliError::Core { source } if source.is_timeout() => TIMEOUT_EXIT_CODE,
            _ => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl From<hourglass_core::Error> for CliError {
    fn from(source: hourglass_core::Error) -> Self {
        CliError::Core { source }
    }
}

impl From<ConfigError> for CliError {
    fn from(source: ConfigError) -> Self {
        CliError::Config { source }
    }
}

impl From<MetricsError> for CliError {
    fn from(source: MetricsError) -> Self {
        CliError::Metrics { source }
    }
}
