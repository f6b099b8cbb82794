//! Error types for calendar resolution, date-math and completion waits.
//!
//! `ClientError` describes what went wrong talking to the cluster.
//! `Error` is what every public operation of this crate returns.

use snafu::prelude::*;

use crate::wait::WaitAction;

// ============ Client Errors ============

/// Errors reported by a [`ClusterClient`](crate::client::ClusterClient).
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    /// The named resource does not exist (HTTP 404).
    ///
    /// `index` carries the name the cluster resolved, which is how date-math
    /// expressions are evaluated remotely.
    #[snafu(display("Resource not found: {reason}"))]
    NotFound {
        index: Option<String>,
        reason: String,
    },

    /// The cluster refused the request (any other non-2xx status).
    #[snafu(display("Request rejected with status {status}: {reason}"))]
    Rejected { status: u16, reason: String },

    /// The request never produced a response.
    #[snafu(display("Transport error: {message}"))]
    Transport { message: String },

    /// The response body could not be decoded.
    #[snafu(display("Failed to decode response: {message}"))]
    Decode { message: String },

    /// The response decoded but did not have the expected shape.
    #[snafu(display("Unexpected response: {message}"))]
    UnexpectedResponse { message: String },
}

impl ClientError {
    /// Check if this error represents a "not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    /// Check if the cluster rejected the request as malformed (4xx other than 404).
    pub fn is_client_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected { status, .. } if (400..500).contains(status))
    }
}

// ============ Core Errors ============

/// Errors returned by the public operations of this crate.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Malformed template, unit, offset, expression or wait arguments.
    #[snafu(display("Configuration error: {message}"))]
    Configuration { message: String },

    /// A timestamp that cannot be read as an integer epoch.
    #[snafu(display("Invalid epoch received, unable to convert {value:?} to an integer"))]
    InvalidEpoch { value: String },

    /// An unexpected remote failure, with the client error attached.
    #[snafu(display("{message}: {source}"))]
    FailedExecution {
        message: String,
        source: ClientError,
    },

    /// A wait reached its `max_wait` ceiling without completing.
    #[snafu(display(
        "Action \"{action}\" failed to complete in the max_wait period of {max_wait} seconds"
    ))]
    ActionTimeout { action: WaitAction, max_wait: u64 },
}

impl Error {
    /// Shorthand for building a [`Error::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error is a wait timeout, the one failure callers are
    /// expected to decide on rather than abort.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ActionTimeout { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejection_classification() {
        let bad_request = ClientError::Rejected {
            status: 400,
            reason: "invalid_index_name_exception".into(),
        };
        assert!(bad_request.is_client_rejection());
        assert!(!bad_request.is_not_found());

        let unavailable = ClientError::Rejected {
            status: 503,
            reason: "master_not_discovered_exception".into(),
        };
        assert!(!unavailable.is_client_rejection());

        let missing = ClientError::NotFound {
            index: Some("logs-2024.01.01".into()),
            reason: "no such index".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_client_rejection());
    }

    #[test]
    fn test_timeout_display_names_action() {
        let err = Error::ActionTimeout {
            action: WaitAction::Snapshot,
            max_wait: 30,
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Action \"snapshot\" failed to complete in the max_wait period of 30 seconds"
        );
    }

    #[test]
    fn test_failed_execution_includes_source() {
        let err = Error::FailedExecution {
            message: "Unable to obtain task information for task_id \"abc:1\"".into(),
            source: ClientError::Transport {
                message: "connection refused".into(),
            },
        };
        let rendered = err.to_string();
        assert!(rendered.contains("abc:1"));
        assert!(rendered.contains("connection refused"));
    }
}
