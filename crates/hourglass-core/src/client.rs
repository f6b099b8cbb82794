//! The remote surface the core needs from a search cluster.
//!
//! Everything here is read-only. The CLI crate ships an HTTP implementation;
//! tests use [`crate::testing::MockClusterClient`].

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Body of `GET /_cluster/health`, kept as raw JSON so any key can be checked.
pub type ClusterHealth = serde_json::Map<String, serde_json::Value>;

/// State of a snapshot as reported by the snapshot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    InProgress,
    Success,
    Partial,
    Failed,
    Incompatible,
    #[serde(other)]
    Unknown,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotState::InProgress => "IN_PROGRESS",
            SnapshotState::Success => "SUCCESS",
            SnapshotState::Partial => "PARTIAL",
            SnapshotState::Failed => "FAILED",
            SnapshotState::Incompatible => "INCOMPATIBLE",
            SnapshotState::Unknown => "UNKNOWN",
        }
    }
}

/// One entry of `GET /_snapshot/{repository}/{snapshot}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub snapshot: String,
    pub state: SnapshotState,
}

/// Envelope of the snapshot API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotList {
    pub snapshots: Vec<SnapshotInfo>,
}

/// Body of `GET /_tasks/{task_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub completed: bool,
    pub task: TaskInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub running_time_in_nanos: u64,
    #[serde(default)]
    pub start_time_in_millis: i64,
}

/// Recovery entry for one index of `GET /{indices}/_recovery`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexRecovery {
    #[serde(default)]
    pub shards: Vec<ShardRecovery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRecovery {
    pub stage: String,
}

/// One shard copy from the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRouting {
    pub state: String,
}

/// Shard copies of one index, keyed by shard number.
pub type RoutingTable = IndexMap<String, Vec<ShardRouting>>;

/// Read-only view of a search cluster.
///
/// Implementations decide transport and authentication. A call either
/// succeeds or returns a [`ClientError`]; nothing here retries.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// `GET /_cluster/health`.
    async fn cluster_health(&self) -> Result<ClusterHealth, ClientError>;

    /// `GET /_snapshot/{repository}/{snapshot}`.
    async fn snapshot_status(
        &self,
        repository: &str,
        snapshot: &str,
    ) -> Result<Vec<SnapshotInfo>, ClientError>;

    /// `GET /_tasks/{task_id}`.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ClientError>;

    /// `GET /{indices}/_recovery?human=true`, keyed by index name.
    ///
    /// An empty map means the cluster has not registered the recovery yet.
    async fn index_recovery(
        &self,
        indices: &[String],
    ) -> Result<IndexMap<String, IndexRecovery>, ClientError>;

    /// Routing table of `index` from `GET /_cluster/state/routing_table/{index}`.
    async fn routing_table(&self, index: &str) -> Result<RoutingTable, ClientError>;

    /// `GET /{name}`.
    ///
    /// Used to let the cluster evaluate a date-math name: the expected answer
    /// is [`ClientError::NotFound`] carrying the resolved name.
    async fn get_index(&self, name: &str) -> Result<serde_json::Value, ClientError>;
}

#[async_trait]
impl<C: ClusterClient + ?Sized> ClusterClient for &C {
    async fn cluster_health(&self) -> Result<ClusterHealth, ClientError> {
        (**self).cluster_health().await
    }

    async fn snapshot_status(
        &self,
        repository: &str,
        snapshot: &str,
    ) -> Result<Vec<SnapshotInfo>, ClientError> {
        (**self).snapshot_status(repository, snapshot).await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        (**self).task_status(task_id).await
    }

    async fn index_recovery(
        &self,
        indices: &[String],
    ) -> Result<IndexMap<String, IndexRecovery>, ClientError> {
        (**self).index_recovery(indices).await
    }

    async fn routing_table(&self, index: &str) -> Result<RoutingTable, ClientError> {
        (**self).routing_table(index).await
    }

    async fn get_index(&self, name: &str) -> Result<serde_json::Value, ClientError> {
        (**self).get_index(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_state_decoding() {
        let list: SnapshotList = serde_json::from_str(
            r#"{"snapshots":[
                {"snapshot":"a","state":"IN_PROGRESS","indices":["x"]},
                {"snapshot":"b","state":"SUCCESS"},
                {"snapshot":"c","state":"SOMETHING_NEW"}
            ]}"#,
        )
        .unwrap();
        let states: Vec<_> = list.snapshots.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            [SnapshotState::InProgress, SnapshotState::Success, SnapshotState::Unknown]
        );
    }

    #[test]
    fn test_task_status_decoding() {
        let status: TaskStatus = serde_json::from_str(
            r#"{"completed":false,"task":{"node":"n1","id":42,
                "description":"reindex from [a] to [b]",
                "start_time_in_millis":1491259817000,
                "running_time_in_nanos":2500000000}}"#,
        )
        .unwrap();
        assert!(!status.completed);
        assert_eq!(status.task.description, "reindex from [a] to [b]");
        assert_eq!(status.task.running_time_in_nanos, 2_500_000_000);
    }

    #[test]
    fn test_recovery_decoding_preserves_order() {
        let recovery: IndexMap<String, IndexRecovery> = serde_json::from_str(
            r#"{"b":{"shards":[{"stage":"DONE","id":0}]},"a":{"shards":[{"stage":"INDEX"}]}}"#,
        )
        .unwrap();
        let names: Vec<_> = recovery.keys().cloned().collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(recovery["a"].shards[0].stage, "INDEX");
    }
}
