//! Completion predicates, one per kind of long-running operation.
//!
//! Each predicate makes one read-only call per evaluation. Remote failures
//! become [`Error::FailedExecution`]; a predicate never retries.

use async_trait::async_trait;
use chrono::DateTime;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::{ClusterClient, SnapshotState};
use crate::error::{ClientError, Error, Result};

/// Recovery stage of a fully restored shard.
const RECOVERY_DONE: &str = "DONE";

/// Routing state of a shard copy that is fully allocated.
const SHARD_STARTED: &str = "STARTED";

/// Decides whether an operation has finished.
#[async_trait]
pub trait CompletionCheck: Send + Sync {
    /// Short kind name, used as a metric label.
    fn name(&self) -> &'static str;

    /// Human readable description of what is being checked.
    fn describe(&self) -> String;

    /// Evaluate once against the cluster.
    async fn is_complete(&self, client: &dyn ClusterClient) -> Result<bool>;
}

/// Cluster health matches every expected key.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheck {
    expected: IndexMap<String, Value>,
}

impl HealthCheck {
    /// Fails when `expected` is empty.
    pub fn new(expected: IndexMap<String, Value>) -> Result<Self> {
        if expected.is_empty() {
            return Err(Error::configuration(
                "Must provide at least one expected cluster health value",
            ));
        }
        Ok(Self { expected })
    }

    /// No shard is moving between nodes.
    pub fn no_relocating_shards() -> Self {
        Self::single("relocating_shards", Value::from(0))
    }

    /// Every primary and replica is allocated.
    pub fn status_green() -> Self {
        Self::single("status", Value::from("green"))
    }

    fn single(key: &str, value: Value) -> Self {
        Self {
            expected: IndexMap::from([(key.to_string(), value)]),
        }
    }

    pub fn expected(&self) -> &IndexMap<String, Value> {
        &self.expected
    }
}

#[async_trait]
impl CompletionCheck for HealthCheck {
    fn name(&self) -> &'static str {
        "health"
    }

    fn describe(&self) -> String {
        let pairs: Vec<_> = self
            .expected
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("cluster health {}", pairs.join(", "))
    }

    async fn is_complete(&self, client: &dyn ClusterClient) -> Result<bool> {
        debug!(expected = ?self.expected, "Checking cluster health");
        let health = client
            .cluster_health()
            .await
            .map_err(|source| Error::FailedExecution {
                message: "Unable to obtain cluster health".into(),
                source,
            })?;

        let mut matched = true;
        for (key, expected) in &self.expected {
            let actual = health.get(key).ok_or_else(|| {
                Error::configuration(format!("Key {key:?} not in cluster health output"))
            })?;
            if actual == expected {
                debug!(%key, %expected, %actual, "MATCH");
            } else {
                debug!(%key, %expected, %actual, "NO MATCH");
                matched = false;
            }
        }

        if matched {
            info!("Health check for all provided keys passed");
        }
        Ok(matched)
    }
}

/// A snapshot has left the `IN_PROGRESS` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCheck {
    repository: String,
    snapshot: String,
}

impl SnapshotCheck {
    pub fn new(repository: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            snapshot: snapshot.into(),
        }
    }

    fn failed(&self, source: ClientError) -> Error {
        Error::FailedExecution {
            message: format!(
                "Unable to obtain information for snapshot {:?} in repository {:?}",
                self.snapshot, self.repository
            ),
            source,
        }
    }
}

#[async_trait]
impl CompletionCheck for SnapshotCheck {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn describe(&self) -> String {
        format!("snapshot {} in repository {}", self.snapshot, self.repository)
    }

    async fn is_complete(&self, client: &dyn ClusterClient) -> Result<bool> {
        let snapshots = client
            .snapshot_status(&self.repository, &self.snapshot)
            .await
            .map_err(|e| self.failed(e))?;
        let state = snapshots
            .first()
            .map(|info| info.state)
            .ok_or_else(|| {
                self.failed(ClientError::UnexpectedResponse {
                    message: "snapshot list is empty".into(),
                })
            })?;
        debug!(snapshot = %self.snapshot, state = state.as_str(), "Snapshot state");

        let snapshot = &self.snapshot;
        match state {
            SnapshotState::InProgress => {
                info!(%snapshot, "Snapshot still in progress");
                return Ok(false);
            }
            SnapshotState::Success => info!(%snapshot, "Snapshot successfully completed"),
            SnapshotState::Partial => warn!(%snapshot, "Snapshot completed with state PARTIAL"),
            SnapshotState::Failed => error!(%snapshot, "Snapshot completed with state FAILED"),
            other => warn!(%snapshot, state = other.as_str(), "Snapshot completed with unexpected state"),
        }
        Ok(true)
    }
}

/// Every shard of the restored indices has finished recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreCheck {
    indices: Vec<String>,
}

impl RestoreCheck {
    pub fn new(indices: Vec<String>) -> Self {
        Self { indices }
    }
}

#[async_trait]
impl CompletionCheck for RestoreCheck {
    fn name(&self) -> &'static str {
        "restore"
    }

    fn describe(&self) -> String {
        format!("recovery of {}", self.indices.join(","))
    }

    async fn is_complete(&self, client: &dyn ClusterClient) -> Result<bool> {
        let recovery = client
            .index_recovery(&self.indices)
            .await
            .map_err(|source| Error::FailedExecution {
                message: "Unable to obtain recovery information for specified indices".into(),
                source,
            })?;

        // the cluster may not have registered the recovery yet
        if recovery.is_empty() {
            info!("_recovery returned an empty response, trying again");
            return Ok(false);
        }

        info!(provided = ?self.indices, found = ?recovery.keys().collect::<Vec<_>>(), "Checking recovery");
        for (index, entry) in &recovery {
            if let Some(shard) = entry.shards.iter().find(|s| s.stage != RECOVERY_DONE) {
                info!(%index, stage = %shard.stage, "Index is still recovering");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A background task reports `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCheck {
    task_id: String,
}

impl TaskCheck {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

#[async_trait]
impl CompletionCheck for TaskCheck {
    fn name(&self) -> &'static str {
        "task"
    }

    fn describe(&self) -> String {
        format!("task {}", self.task_id)
    }

    async fn is_complete(&self, client: &dyn ClusterClient) -> Result<bool> {
        let status = client
            .task_status(&self.task_id)
            .await
            .map_err(|source| Error::FailedExecution {
                message: format!(
                    "Unable to obtain task information for task_id {:?}",
                    self.task_id
                ),
                source,
            })?;

        let task = &status.task;
        let running_secs = task.running_time_in_nanos as f64 / 1e9;
        debug!(running_secs, "Task running time");

        if status.completed {
            let finished_ms =
                task.start_time_in_millis + (task.running_time_in_nanos / 1_000_000) as i64;
            let finished = DateTime::from_timestamp_millis(finished_ms)
                .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_else(|| finished_ms.to_string());
            info!(description = %task.description, %finished, "Task completed");
            Ok(true)
        } else {
            debug!(?status, "Full task data");
            info!(
                description = %task.description,
                task_id = %self.task_id,
                running_secs,
                "Task still running"
            );
            Ok(false)
        }
    }
}

/// Every shard copy of an index is `STARTED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateCheck {
    index: String,
}

impl RelocateCheck {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }
}

#[async_trait]
impl CompletionCheck for RelocateCheck {
    fn name(&self) -> &'static str {
        "relocate"
    }

    fn describe(&self) -> String {
        format!("shard relocation of {}", self.index)
    }

    async fn is_complete(&self, client: &dyn ClusterClient) -> Result<bool> {
        let routing = client
            .routing_table(&self.index)
            .await
            .map_err(|source| Error::FailedExecution {
                message: format!("Unable to obtain routing table for index {:?}", self.index),
                source,
            })?;

        let started = routing
            .values()
            .all(|copies| copies.iter().all(|copy| copy.state == SHARD_STARTED));
        if started {
            info!(index = %self.index, "Relocate check passed");
        } else {
            debug!(index = %self.index, "Shards still moving");
        }
        Ok(started)
    }
}
