//! In-memory stand-ins for the cluster, for tests.
//!
//! Responses are scripted per method. Each call takes the next scripted
//! response; the last one is repeated once the script runs out, so a single
//! `with_*` call describes a steady state.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::client::{
    ClusterClient, ClusterHealth, IndexRecovery, RoutingTable, SnapshotInfo, TaskStatus,
};
use crate::datemath::DateMathOracle;
use crate::error::ClientError;

type Reply<T> = Result<T, ClientError>;
type ProbeFn = Box<dyn Fn(&str) -> ClientError + Send + Sync>;
type EchoFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Build a [`ClusterHealth`] from a JSON object literal.
///
/// Non-object values produce an empty health map.
pub fn health(value: serde_json::Value) -> ClusterHealth {
    match value {
        serde_json::Value::Object(map) => map,
        _ => ClusterHealth::new(),
    }
}

struct Script<T> {
    replies: VecDeque<Reply<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: VecDeque::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    fn push(&mut self, reply: Reply<T>) {
        self.replies.push_back(reply);
    }

    fn next(&mut self, method: &str) -> Reply<T> {
        if self.replies.len() > 1 {
            if let Some(reply) = self.replies.pop_front() {
                return reply;
            }
        }
        self.replies
            .front()
            .cloned()
            .unwrap_or_else(|| {
                Err(ClientError::UnexpectedResponse {
                    message: format!("no scripted response for {method}"),
                })
            })
    }
}

#[derive(Default)]
struct Scripts {
    health: Script<ClusterHealth>,
    snapshot: Script<Vec<SnapshotInfo>>,
    task: Script<TaskStatus>,
    recovery: Script<IndexMap<String, IndexRecovery>>,
    routing: Script<RoutingTable>,
    calls: Vec<String>,
}

/// A [`ClusterClient`] answering from scripted responses.
#[derive(Default)]
pub struct MockClusterClient {
    scripts: Mutex<Scripts>,
    probe: Option<ProbeFn>,
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_health(self, reply: Reply<ClusterHealth>) -> Self {
        self.script(|s| s.health.push(reply));
        self
    }

    pub fn with_snapshot(self, reply: Reply<Vec<SnapshotInfo>>) -> Self {
        self.script(|s| s.snapshot.push(reply));
        self
    }

    pub fn with_task(self, reply: Reply<TaskStatus>) -> Self {
        self.script(|s| s.task.push(reply));
        self
    }

    pub fn with_recovery(self, reply: Reply<IndexMap<String, IndexRecovery>>) -> Self {
        self.script(|s| s.recovery.push(reply));
        self
    }

    pub fn with_routing(self, reply: Reply<RoutingTable>) -> Self {
        self.script(|s| s.routing.push(reply));
        self
    }

    /// Answer `get_index` with the error built by `probe`.
    ///
    /// Without a probe every index exists and `get_index` returns `{}`.
    pub fn with_index_probe(
        mut self,
        probe: impl Fn(&str) -> ClientError + Send + Sync + 'static,
    ) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Every call made so far, as `method` or `method arg`.
    pub fn calls(&self) -> Vec<String> {
        self.script(|s| s.calls.clone())
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.script(|s| {
            s.calls
                .iter()
                .filter(|call| call.split(' ').next() == Some(method))
                .count()
        })
    }

    fn script<R>(&self, f: impl FnOnce(&mut Scripts) -> R) -> R {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut scripts)
    }

    fn record(&self, call: String) {
        self.script(|s| s.calls.push(call));
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn cluster_health(&self) -> Result<ClusterHealth, ClientError> {
        self.record("cluster_health".into());
        self.script(|s| s.health.next("cluster_health"))
    }

    async fn snapshot_status(
        &self,
        repository: &str,
        snapshot: &str,
    ) -> Result<Vec<SnapshotInfo>, ClientError> {
        self.record(format!("snapshot_status {repository}/{snapshot}"));
        self.script(|s| s.snapshot.next("snapshot_status"))
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.record(format!("task_status {task_id}"));
        self.script(|s| s.task.next("task_status"))
    }

    async fn index_recovery(
        &self,
        indices: &[String],
    ) -> Result<IndexMap<String, IndexRecovery>, ClientError> {
        self.record(format!("index_recovery {}", indices.join(",")));
        self.script(|s| s.recovery.next("index_recovery"))
    }

    async fn routing_table(&self, index: &str) -> Result<RoutingTable, ClientError> {
        self.record(format!("routing_table {index}"));
        self.script(|s| s.routing.next("routing_table"))
    }

    async fn get_index(&self, name: &str) -> Result<serde_json::Value, ClientError> {
        self.record(format!("get_index {name}"));
        match &self.probe {
            Some(probe) => Err(probe(name)),
            None => Ok(serde_json::json!({})),
        }
    }
}

/// A [`DateMathOracle`] answering from a fixed table or a closure.
#[derive(Default)]
pub struct MockOracle {
    answers: IndexMap<String, Reply<String>>,
    echo: Option<EchoFn>,
    calls: Mutex<Vec<String>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every expression with `echo(expression)`.
    pub fn echoing(echo: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            echo: Some(Box::new(echo)),
            ..Self::default()
        }
    }

    /// Answer `expression` with `reply`.
    pub fn with(mut self, expression: &str, reply: Reply<String>) -> Self {
        self.answers.insert(expression.to_string(), reply);
        self
    }

    /// Expressions received so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DateMathOracle for MockOracle {
    async fn resolve_expression(&self, expression: &str) -> Result<String, ClientError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(expression.to_string());

        if let Some(reply) = self.answers.get(expression) {
            return reply.clone();
        }
        match &self.echo {
            Some(echo) => Ok(echo(expression)),
            None => Err(ClientError::NotFound {
                index: None,
                reason: format!("no scripted answer for {expression}"),
            }),
        }
    }
}
