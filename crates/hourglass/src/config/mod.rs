//! YAML configuration.
//!
//! ```yaml
//! client:
//!   url: "http://localhost:9200"
//!   username: "${ES_USER:-}"
//!   password: "${ES_PASSWORD:-}"
//!   request_timeout_secs: 30
//! wait:
//!   interval_secs: 9
//!   max_wait_secs: -1
//! metrics:
//!   address: "0.0.0.0:9090"
//! ```
//!
//! Every section and field is optional. Environment variables are
//! interpolated before the YAML is parsed.

mod vars;

pub use vars::{interpolate, interpolate_with};

use std::path::Path;
use std::time::Duration;

use hourglass_core::wait::MaxWait;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::debug;

use crate::error::{ConfigError, ReadFileSnafu, YamlParseSnafu};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load from `path`, or use the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_yaml(&contents)
    }

    /// Interpolate, parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let text = interpolate(contents)?;
        // an empty document is the default config
        let config: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&text).context(YamlParseSnafu)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;
        self.wait.validate()
    }
}

/// Connection to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Username and password, if a non-empty username is configured.
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty());
        Some((username, password))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.url).map_err(|e| ConfigError::InvalidValue {
            field: "client.url".into(),
            message: format!("{:?} is not a valid URL: {e}", self.url),
        })?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "client.url".into(),
                message: format!("{:?} must be an http or https URL", self.url),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Defaults for `wait` commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// `-1` waits without limit.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: i64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_wait(&self) -> Result<MaxWait, ConfigError> {
        MaxWait::try_from(self.max_wait_secs).map_err(|e| ConfigError::InvalidValue {
            field: "wait.max_wait_secs".into(),
            message: e.to_string(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "wait.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        self.max_wait().map(|_| ())
    }
}

fn default_interval_secs() -> u64 {
    9
}

fn default_max_wait_secs() -> i64 {
    -1
}

/// Prometheus exporter settings. No exporter runs without an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub address: Option<String>,
}
