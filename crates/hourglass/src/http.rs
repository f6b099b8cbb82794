//! [`ClusterClient`] over the cluster's REST API.

use async_trait::async_trait;
use hourglass_core::ClientError;
use hourglass_core::client::{
    ClusterClient, ClusterHealth, IndexRecovery, RoutingTable, SnapshotInfo, SnapshotList,
    TaskStatus,
};
use indexmap::IndexMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::prelude::*;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ConfigError, HttpClientSnafu};

/// HTTP client for a single cluster endpoint.
#[derive(Debug, Clone)]
pub struct HttpClusterClient {
    http: reqwest::Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpClusterClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.url).map_err(|e| ConfigError::InvalidValue {
            field: "client.url".into(),
            message: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context(HttpClientSnafu)?;
        let (username, password) = match config.credentials() {
            Some((user, pass)) => (Some(user.to_string()), pass.map(str::to_string)),
            None => (None, None),
        };

        Ok(Self {
            http,
            base,
            username,
            password,
        })
    }

    /// Base URL extended by `segments`, each percent-encoded on its own.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport {
                message: format!("{} cannot be used as a base URL", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        debug!(%url, "GET");
        let mut request = self.http.get(url.clone());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await.map_err(|e| ClientError::Transport {
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| ClientError::Transport {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            debug!(%url, %status, "Request failed");
            return Err(error_from_response(status, &body));
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
            message: format!("{url}: {e}"),
        })
    }
}

/// Map a non-2xx response to a [`ClientError`].
///
/// Error bodies look like `{"error": {"type": ..., "reason": ..., "index": ...}}`.
/// The `index` of a 404 is what date-math probes read.
fn error_from_response(status: StatusCode, body: &[u8]) -> ClientError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let reason = match error {
        Some(Value::String(reason)) => reason.clone(),
        Some(error) => error
            .get("reason")
            .or_else(|| error.get("type"))
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
        None => String::from_utf8_lossy(body).into_owned(),
    };

    if status == StatusCode::NOT_FOUND {
        let index = error
            .and_then(|e| e.get("index"))
            .and_then(Value::as_str)
            .map(str::to_string);
        ClientError::NotFound { index, reason }
    } else {
        ClientError::Rejected {
            status: status.as_u16(),
            reason,
        }
    }
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    async fn cluster_health(&self) -> Result<ClusterHealth, ClientError> {
        self.get(self.url(&["_cluster", "health"])?).await
    }

    async fn snapshot_status(
        &self,
        repository: &str,
        snapshot: &str,
    ) -> Result<Vec<SnapshotInfo>, ClientError> {
        let list: SnapshotList = self.get(self.url(&["_snapshot", repository, snapshot])?).await?;
        Ok(list.snapshots)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.get(self.url(&["_tasks", task_id])?).await
    }

    async fn index_recovery(
        &self,
        indices: &[String],
    ) -> Result<IndexMap<String, IndexRecovery>, ClientError> {
        let csv = indices.join(",");
        let mut url = self.url(&[csv.as_str(), "_recovery"])?;
        url.query_pairs_mut().append_pair("human", "true");
        self.get(url).await
    }

    async fn routing_table(&self, index: &str) -> Result<RoutingTable, ClientError> {
        let state: Value = self
            .get(self.url(&["_cluster", "state", "routing_table", index])?)
            .await?;
        let shards = state
            .pointer("/routing_table/indices")
            .and_then(|indices| indices.get(index))
            .and_then(|entry| entry.get("shards"))
            .cloned()
            .ok_or_else(|| ClientError::UnexpectedResponse {
                message: format!("routing table has no entry for index {index:?}"),
            })?;
        serde_json::from_value(shards).map_err(|e| ClientError::Decode {
            message: e.to_string(),
        })
    }

    async fn get_index(&self, name: &str) -> Result<Value, ClientError> {
        self.get(self.url(&[name])?).await
    }
}
