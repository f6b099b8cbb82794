//! Time-window resolution and completion polling for search cluster
//! lifecycle tooling.
//!
//! Retention and rotation jobs decide what to touch by time: "indices older
//! than 30 days", "last month's snapshot", "today's index". This crate turns
//! those phrases into concrete names and epoch boundaries:
//!
//! - [`pattern`]: render `%Y.%m.%d`-style timestrings and read dates back out
//!   of resource names
//! - [`calendar`]: relative and absolute calendar windows
//! - [`datemath`]: resolve `<name-{now/d}>` expressions against the cluster
//! - [`epoch`]: normalize timestamps of unknown resolution to seconds
//!
//! Once a job has issued a non-blocking operation, [`wait`] polls the cluster
//! until the operation finishes or a ceiling is reached.
//!
//! The cluster itself is reached through the [`client::ClusterClient`] trait.

pub mod calendar;
pub mod client;
pub mod datemath;
pub mod epoch;
pub mod error;
pub mod metrics;
pub mod pattern;
pub mod types;
pub mod wait;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ClientError, Error, Result};
pub use types::{DateRange, TimeUnit, WeekStart};
