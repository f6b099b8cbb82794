//! Command execution.
//!
//! Each command returns the text to print, so `main` only decides where
//! output and errors go.

use std::time::Duration;

use hourglass_core::calendar::{absolute_window, relative_window};
use hourglass_core::client::ClusterClient;
use hourglass_core::datemath::{IndexProbe, is_datemath, parse_date_math};
use hourglass_core::pattern::{PatternTemplate, render};
use hourglass_core::wait::{WaitSpec, wait_for_completion};
use hourglass_core::DateRange;
use tracing::info;

use crate::cli::{AbsoluteRange, CliArgs, Command, RangeCommand, RelativeRange, WaitCommand};
use crate::config::{Config, WaitConfig};
use crate::error::{CliError, ConfigError};
use crate::http::HttpClusterClient;
use crate::telemetry::init_metrics;

/// Load the configuration and run the requested command.
pub async fn run(args: CliArgs) -> Result<String, CliError> {
    let config = Config::load(args.config.as_deref())?;
    if let Some(address) = &config.metrics.address {
        init_metrics(address)?;
    }

    match args.command {
        Command::Range(RangeCommand::Relative(range)) => relative_range(&range),
        Command::Range(RangeCommand::Absolute(range)) => absolute_range(&range),
        Command::Epoch { name, timestring } => extract_epoch(&name, &timestring),
        Command::Render { name } => {
            if is_datemath(&name)? {
                let client = HttpClusterClient::new(&config.client)?;
                render_name(&client, &name).await
            } else {
                Ok(render(&name))
            }
        }
        Command::Wait(wait) => {
            let client = HttpClusterClient::new(&config.client)?;
            run_wait(&client, &config.wait, &wait).await
        }
    }
}

pub fn relative_range(range: &RelativeRange) -> Result<String, CliError> {
    let window = relative_window(
        range.unit,
        range.from,
        range.to,
        range.epoch,
        range.week_starts_on,
    )?;
    Ok(format_range(&window))
}

pub fn absolute_range(range: &AbsoluteRange) -> Result<String, CliError> {
    let window = absolute_window(
        range.unit,
        &range.from,
        &range.to,
        range.from_format.as_deref(),
        range.to_format.as_deref(),
    )?;
    Ok(format_range(&window))
}

pub fn extract_epoch(name: &str, timestring: &str) -> Result<String, CliError> {
    let pattern = PatternTemplate::compile(timestring)?;
    match pattern.search(name)? {
        Some(epoch) => Ok(epoch.to_string()),
        None => Err(CliError::NoDateFound {
            name: name.to_string(),
            timestring: timestring.to_string(),
        }),
    }
}

/// Render `name`, asking the cluster to resolve date math.
pub async fn render_name<C: ClusterClient>(client: C, name: &str) -> Result<String, CliError> {
    let probe = IndexProbe::new(client);
    Ok(parse_date_math(&probe, name).await?)
}

/// Wait on an action, with CLI flags taking precedence over the config.
pub async fn run_wait<C: ClusterClient>(
    client: C,
    defaults: &WaitConfig,
    wait: &WaitCommand,
) -> Result<String, CliError> {
    let spec = wait_spec(defaults, wait)?;
    wait_for_completion(client, &spec).await?;
    info!(action = %spec.action, "Wait complete");
    Ok(format!("{} complete", spec.action))
}

pub fn wait_spec(defaults: &WaitConfig, wait: &WaitCommand) -> Result<WaitSpec, CliError> {
    let interval = wait
        .interval
        .map_or_else(|| defaults.interval(), Duration::from_secs);
    let overrides = WaitConfig {
        interval_secs: interval.as_secs(),
        max_wait_secs: wait.max_wait.unwrap_or(defaults.max_wait_secs),
    };
    let max_wait = overrides.max_wait().map_err(|e| match e {
        ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
            field: "--max-wait".into(),
            message,
        },
        other => other,
    })?;

    Ok(WaitSpec::new(wait.action)
        .with_args(wait.wait_args())
        .with_interval(interval)
        .with_max_wait(max_wait))
}

/// `start end` on the first line, ISO-8601 renderings on the second.
pub fn format_range(range: &DateRange) -> String {
    format!("{} {}\n{range}", range.start(), range.end())
}
