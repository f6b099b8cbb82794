//! Waiting for long-running cluster operations.
//!
//! Snapshots, restores, reindexing and shard movement all return before the
//! work is done. A [`WaitEngine`] polls a [`CompletionCheck`] for the action
//! until it reports completion or the `max_wait` ceiling is reached.
//!
//! ```no_run
//! # async fn run(client: impl hourglass_core::client::ClusterClient) -> hourglass_core::Result<()> {
//! use std::time::Duration;
//! use hourglass_core::wait::{wait_for_completion, MaxWait, WaitAction, WaitArgs, WaitSpec};
//!
//! let spec = WaitSpec::new(WaitAction::Snapshot)
//!     .with_args(WaitArgs::snapshot("backups", "nightly-2024.01.01"))
//!     .with_interval(Duration::from_secs(5))
//!     .with_max_wait(MaxWait::Seconds(600));
//! wait_for_completion(&client, &spec).await?;
//! # Ok(())
//! # }
//! ```

pub mod predicates;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::client::ClusterClient;
use crate::emit;
use crate::error::{Error, Result};
use crate::metrics::events::{PredicateEvaluated, WaitFinished, WaitStatus};

pub use predicates::{
    CompletionCheck, HealthCheck, RelocateCheck, RestoreCheck, SnapshotCheck, TaskCheck,
};

/// Default pause between two evaluations.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(9);

/// Operations that can be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitAction {
    Allocation,
    Replicas,
    ClusterRouting,
    Snapshot,
    Restore,
    Reindex,
    Shrink,
    Relocate,
}

impl WaitAction {
    pub const ALL: [WaitAction; 8] = [
        WaitAction::Allocation,
        WaitAction::Replicas,
        WaitAction::ClusterRouting,
        WaitAction::Snapshot,
        WaitAction::Restore,
        WaitAction::Reindex,
        WaitAction::Shrink,
        WaitAction::Relocate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitAction::Allocation => "allocation",
            WaitAction::Replicas => "replicas",
            WaitAction::ClusterRouting => "cluster_routing",
            WaitAction::Snapshot => "snapshot",
            WaitAction::Restore => "restore",
            WaitAction::Reindex => "reindex",
            WaitAction::Shrink => "shrink",
            WaitAction::Relocate => "relocate",
        }
    }
}

impl fmt::Display for WaitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        WaitAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = WaitAction::ALL.iter().map(WaitAction::as_str).collect();
                Error::configuration(format!("\"action\" must be one of {names:?}"))
            })
    }
}

/// Arguments some actions need to find the operation they wait on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaitArgs {
    pub task_id: Option<String>,
    pub snapshot: Option<String>,
    pub repository: Option<String>,
    pub index: Option<String>,
    pub index_list: Option<Vec<String>>,
}

impl WaitArgs {
    pub fn task(task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            ..Self::default()
        }
    }

    pub fn snapshot(repository: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            repository: Some(repository.into()),
            snapshot: Some(snapshot.into()),
            ..Self::default()
        }
    }

    pub fn index(index: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            ..Self::default()
        }
    }

    pub fn index_list<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index_list: Some(indices.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

/// Ceiling on how long a wait may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxWait {
    /// Poll until the predicate reports completion.
    #[default]
    Unbounded,
    /// Give up once this many whole seconds have elapsed.
    Seconds(u64),
}

impl MaxWait {
    /// The bound in seconds, `None` when unbounded.
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            MaxWait::Unbounded => None,
            MaxWait::Seconds(secs) => Some(*secs),
        }
    }
}

impl TryFrom<i64> for MaxWait {
    type Error = Error;

    /// `-1` means unbounded; other negative values are rejected.
    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(MaxWait::Unbounded),
            secs if secs >= 0 => Ok(MaxWait::Seconds(secs.unsigned_abs())),
            other => Err(Error::configuration(format!(
                "\"max_wait\" must be -1 (unbounded) or a non-negative number of seconds, got {other}"
            ))),
        }
    }
}

impl fmt::Display for MaxWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxWait::Unbounded => f.write_str("-1"),
            MaxWait::Seconds(secs) => write!(f, "{secs}"),
        }
    }
}

/// Everything needed to wait on one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    pub action: WaitAction,
    pub args: WaitArgs,
    pub wait_interval: Duration,
    pub max_wait: MaxWait,
}

impl WaitSpec {
    /// A spec with no arguments, the default interval and no ceiling.
    pub fn new(action: WaitAction) -> Self {
        Self {
            action,
            args: WaitArgs::default(),
            wait_interval: DEFAULT_WAIT_INTERVAL,
            max_wait: MaxWait::Unbounded,
        }
    }

    pub fn with_args(mut self, args: WaitArgs) -> Self {
        self.args = args;
        self
    }

    pub fn with_interval(mut self, wait_interval: Duration) -> Self {
        self.wait_interval = wait_interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: MaxWait) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Validate the spec and build the predicate its action waits on.
    pub fn completion_check(&self) -> Result<Box<dyn CompletionCheck>> {
        if self.wait_interval.is_zero() {
            return Err(Error::configuration("\"wait_interval\" must be greater than 0"));
        }

        let action = self.action;
        let args = &self.args;
        let check: Box<dyn CompletionCheck> = match action {
            WaitAction::Allocation | WaitAction::ClusterRouting => {
                Box::new(HealthCheck::no_relocating_shards())
            }
            WaitAction::Replicas | WaitAction::Shrink => Box::new(HealthCheck::status_green()),
            WaitAction::Snapshot => match (&args.repository, &args.snapshot) {
                (Some(repository), Some(snapshot)) => {
                    Box::new(SnapshotCheck::new(repository.clone(), snapshot.clone()))
                }
                _ => {
                    return Err(Error::configuration(format!(
                        "A snapshot and repository must accompany \"action\" {action}. \
                         snapshot: {:?}, repository: {:?}",
                        args.snapshot, args.repository
                    )));
                }
            },
            WaitAction::Restore => match &args.index_list {
                Some(indices) if !indices.is_empty() => Box::new(RestoreCheck::new(indices.clone())),
                _ => {
                    return Err(Error::configuration(format!(
                        "An index_list must accompany \"action\" {action}"
                    )));
                }
            },
            WaitAction::Reindex => match &args.task_id {
                Some(task_id) => Box::new(TaskCheck::new(task_id.clone())),
                None => {
                    return Err(Error::configuration(format!(
                        "A task_id must accompany \"action\" {action}"
                    )));
                }
            },
            WaitAction::Relocate => match &args.index {
                Some(index) => Box::new(RelocateCheck::new(index.clone())),
                None => {
                    return Err(Error::configuration(format!(
                        "An index must accompany \"action\" {action}"
                    )));
                }
            },
        };
        Ok(check)
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    TimedOut { elapsed: Duration },
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed)
    }

    /// Turn a timeout into [`Error::ActionTimeout`].
    pub fn ensure_completed(self, action: WaitAction, max_wait: MaxWait) -> Result<()> {
        match self {
            PollOutcome::Completed => Ok(()),
            PollOutcome::TimedOut { .. } => Err(Error::ActionTimeout {
                action,
                max_wait: max_wait.as_secs().unwrap_or_default(),
            }),
        }
    }
}

/// Polls completion predicates against one cluster.
#[derive(Debug, Clone)]
pub struct WaitEngine<C> {
    client: C,
}

impl<C: ClusterClient> WaitEngine<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Validate `spec`, then poll its action's predicate.
    ///
    /// Reindex waits first make sure the task can be found at all, so a
    /// mistyped task id fails at once instead of after `max_wait`.
    pub async fn wait(&self, spec: &WaitSpec) -> Result<PollOutcome> {
        let check = spec.completion_check()?;

        if let (WaitAction::Reindex, Some(task_id)) = (spec.action, &spec.args.task_id) {
            self.client
                .task_status(task_id)
                .await
                .map_err(|source| Error::FailedExecution {
                    message: format!("Unable to find task_id {task_id}"),
                    source,
                })?;
        }

        info!(
            action = %spec.action,
            check = %check.describe(),
            interval_secs = spec.wait_interval.as_secs_f64(),
            max_wait = %spec.max_wait,
            "Waiting for action to complete"
        );

        let start = Instant::now();
        let result = self
            .poll(check.as_ref(), spec.wait_interval, spec.max_wait)
            .await;

        let status = match &result {
            Ok(PollOutcome::Completed) => {
                debug!(
                    action = %spec.action,
                    "Action finished executing (may or may not have been successful)"
                );
                WaitStatus::Completed
            }
            Ok(PollOutcome::TimedOut { .. }) => {
                error!(
                    action = %spec.action,
                    max_wait = %spec.max_wait,
                    "Unable to complete action within max_wait seconds"
                );
                WaitStatus::TimedOut
            }
            Err(_) => WaitStatus::Failed,
        };
        emit!(WaitFinished {
            action: spec.action,
            status,
            duration: start.elapsed(),
        });

        result
    }

    /// Evaluate `check` every `interval` until it reports completion or
    /// `max_wait` whole seconds have elapsed.
    ///
    /// The predicate is always evaluated at least once. Elapsed time is
    /// measured before each evaluation.
    pub async fn poll<P>(&self, check: &P, interval: Duration, max_wait: MaxWait) -> Result<PollOutcome>
    where
        P: CompletionCheck + ?Sized,
    {
        let start = Instant::now();

        loop {
            let elapsed = start.elapsed();
            debug!(elapsed_secs = elapsed.as_secs(), "Elapsed time");

            let complete = check.is_complete(&self.client).await?;
            emit!(PredicateEvaluated {
                check: check.name(),
                complete,
            });
            debug!(check = %check.describe(), complete, "Response");

            if complete {
                return Ok(PollOutcome::Completed);
            }
            if let Some(limit) = max_wait.as_secs()
                && elapsed.as_secs() >= limit
            {
                return Ok(PollOutcome::TimedOut { elapsed });
            }

            debug!(
                check = %check.describe(),
                elapsed_secs = elapsed.as_secs(),
                "Not yet complete, waiting {}s before checking again",
                interval.as_secs_f64()
            );
            tokio::time::sleep(interval).await;
        }
    }
}

/// Wait on `spec` and fail with [`Error::ActionTimeout`] if it times out.
pub async fn wait_for_completion<C: ClusterClient>(client: C, spec: &WaitSpec) -> Result<()> {
    WaitEngine::new(client)
        .wait(spec)
        .await?
        .ensure_completed(spec.action, spec.max_wait)
}
