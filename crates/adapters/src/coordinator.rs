// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator client: how the scheduler hands a distributed DAG's
//! run off to whatever picks a remote worker for it.
//!
//! The coordinator's own wire protocol (worker selection, heartbeats,
//! result delivery) is out of scope here — this is deliberately a thin
//! request/response shim so the dispatcher has one narrow seam to mock.

use async_trait::async_trait;
use loom_wire::{TaskAck, TaskMessage};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("coordinator rejected dispatch: {0}")]
    Rejected(String),
}

/// Send tasks to the coordinator and let it fan them out to remote
/// workers.
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    async fn dispatch(&self, task: TaskMessage) -> Result<TaskAck, CoordinatorError>;
    async fn cleanup(&self, task: TaskMessage) -> Result<TaskAck, CoordinatorError>;
}

/// `reqwest`-backed client speaking a plain JSON POST protocol to the
/// coordinator's HTTP endpoint.
pub struct HttpCoordinatorClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpCoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { base_url: base_url.into(), http }
    }

    async fn post(&self, path: &str, task: TaskMessage) -> Result<TaskAck, CoordinatorError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.http.post(&url).json(&task).send().await?.error_for_status()?;
        let ack: TaskAck = response.json().await?;
        if !ack.accepted {
            return Err(CoordinatorError::Rejected(
                ack.detail.unwrap_or_else(|| "coordinator declined the task".to_string()),
            ));
        }
        Ok(ack)
    }
}

#[async_trait]
impl CoordinatorClient for HttpCoordinatorClient {
    async fn dispatch(&self, task: TaskMessage) -> Result<TaskAck, CoordinatorError> {
        self.post("tasks/dispatch", task).await
    }

    async fn cleanup(&self, task: TaskMessage) -> Result<TaskAck, CoordinatorError> {
        self.post("tasks/cleanup", task).await
    }
}

/// Process-wide lazily-initialized coordinator client, so collaborators
/// deep in the dispatch path don't need the base URL threaded through
/// every constructor — it's resolved once from configuration at first
/// use.
static COORDINATOR: tokio::sync::OnceCell<std::sync::Arc<dyn CoordinatorClient>> =
    tokio::sync::OnceCell::const_new();

/// Fetch the process-wide coordinator client, initializing it from
/// `base_url` on first call. Subsequent calls ignore `base_url` and
/// return the already-initialized client.
pub async fn coordinator_client(base_url: &str) -> std::sync::Arc<dyn CoordinatorClient> {
    COORDINATOR
        .get_or_init(|| async { std::sync::Arc::new(HttpCoordinatorClient::new(base_url)) as _ })
        .await
        .clone()
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{CoordinatorClient, CoordinatorError};
    use async_trait::async_trait;
    use loom_wire::{TaskAck, TaskMessage};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every task it was asked to relay and always accepts.
    #[derive(Clone, Default)]
    pub struct FakeCoordinatorClient {
        calls: Arc<Mutex<Vec<TaskMessage>>>,
    }

    impl FakeCoordinatorClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<TaskMessage> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CoordinatorClient for FakeCoordinatorClient {
        async fn dispatch(&self, task: TaskMessage) -> Result<TaskAck, CoordinatorError> {
            self.calls.lock().push(task);
            Ok(TaskAck { accepted: true, detail: None })
        }

        async fn cleanup(&self, task: TaskMessage) -> Result<TaskAck, CoordinatorError> {
            self.calls.lock().push(task);
            Ok(TaskAck { accepted: true, detail: None })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCoordinatorClient;

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
