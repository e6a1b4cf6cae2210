//! Workers re-enter TaskCore through its authenticated HTTP surface with
//! a service credential, acting on behalf of the user carried in the
//! event. `TaskCoreApi` is the seam; tests and single-process deployments
//! use the in-process implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use quill_core::ids::{TaskId, UserId};
use quill_core::task::Task;
use quill_core::CoreError;
use quill_tasks::{CreateTask, TaskService};

pub use quill_auth::ACTING_USER_HEADER;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait TaskCoreApi: Send + Sync {
    /// Fetch a task scoped to its owner; `None` when missing or deleted.
    async fn get_task(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, CoreError>;

    async fn create_task(&self, owner: UserId, params: CreateTask) -> Result<Task, CoreError>;
}

/// HTTP client presenting a service bearer token.
pub struct HttpTaskCore {
    client: reqwest::Client,
    base_url: String,
    service_token: String,
}

impl HttpTaskCore {
    pub fn new(base_url: impl Into<String>, service_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            service_token: service_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TaskCoreApi for HttpTaskCore {
    async fn get_task(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, CoreError> {
        let response = self
            .client
            .get(self.url(&format!("/tasks/{id}")))
            .bearer_auth(&self.service_token)
            .header(ACTING_USER_HEADER, owner.to_string())
            .send()
            .await
            .map_err(|e| CoreError::UpstreamTransient(format!("task core: {e}")))?;

        match response.status().as_u16() {
            200 => {
                let task = response
                    .json::<Task>()
                    .await
                    .map_err(|e| CoreError::UpstreamTransient(format!("decode task: {e}")))?;
                Ok(Some(task))
            }
            404 => Ok(None),
            401 | 403 => Err(CoreError::Unauthorized),
            status if (500..600).contains(&status) => Err(CoreError::UpstreamTransient(format!(
                "task core returned {status}"
            ))),
            status => Err(CoreError::UpstreamPermanent(format!(
                "task core returned {status}"
            ))),
        }
    }

    async fn create_task(&self, owner: UserId, params: CreateTask) -> Result<Task, CoreError> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .bearer_auth(&self.service_token)
            .header(ACTING_USER_HEADER, owner.to_string())
            .json(&params)
            .send()
            .await
            .map_err(|e| CoreError::UpstreamTransient(format!("task core: {e}")))?;

        match response.status().as_u16() {
            200 | 201 => response
                .json::<Task>()
                .await
                .map_err(|e| CoreError::UpstreamTransient(format!("decode task: {e}"))),
            400 | 422 => {
                let body = response.text().await.unwrap_or_default();
                warn!(body, "task core rejected successor creation");
                Err(CoreError::Validation(body))
            }
            401 | 403 => Err(CoreError::Unauthorized),
            status if (500..600).contains(&status) => Err(CoreError::UpstreamTransient(format!(
                "task core returned {status}"
            ))),
            status => Err(CoreError::UpstreamPermanent(format!(
                "task core returned {status}"
            ))),
        }
    }
}

/// In-process implementation used in tests and single-binary deployments.
pub struct LocalTaskCore {
    service: Arc<TaskService>,
}

impl LocalTaskCore {
    pub fn new(service: Arc<TaskService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TaskCoreApi for LocalTaskCore {
    async fn get_task(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, CoreError> {
        match self.service.get_task(owner, id) {
            Ok(task) => Ok(Some(task)),
            Err(CoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_task(&self, owner: UserId, params: CreateTask) -> Result<Task, CoreError> {
        self.service.create_task(owner, params)
    }
}
