//! Tracing and metrics initialization for the CLI.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use snafu::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{InvalidAddressSnafu, MetricsError, PrometheusInitSnafu};

/// Histogram buckets for wait durations, in seconds.
const WAIT_DURATION_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 21600.0,
];

/// Initialize tracing.
///
/// Uses the `RUST_LOG` environment variable for filtering, defaulting to
/// `info`. Logs go to stderr so command output on stdout stays parseable.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

/// Install the Prometheus recorder and serve `/metrics` on `address`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(address: &str) -> Result<(), MetricsError> {
    let addr: SocketAddr = address.parse().context(InvalidAddressSnafu { address })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(WAIT_DURATION_BUCKETS)
        .context(PrometheusInitSnafu)?
        .install()
        .context(PrometheusInitSnafu)?;

    info!(%addr, "Metrics exporter started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_metrics_address() {
        let err = init_metrics("not-an-address").unwrap_err();
        assert!(matches!(err, MetricsError::InvalidAddress { .. }));
        assert!(err.to_string().contains("not-an-address"));
    }
}
