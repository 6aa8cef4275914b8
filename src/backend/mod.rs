//! REST collaborator the editor talks to for codes, definitions and task states.

pub mod client;

pub use client::HttpBackend;

use crate::core::dag::schema::{ProjectCode, TaskCode, TaskInstance, WorkflowDefinition};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Allocate `count` fresh task codes in `project_code`.
    async fn request_task_codes(
        &self,
        count: usize,
        project_code: ProjectCode,
    ) -> Result<Vec<TaskCode>, BackendError>;

    /// Task instances of one workflow instance, in server order.
    async fn query_task_list_by_instance(
        &self,
        instance_id: i64,
        project_code: ProjectCode,
    ) -> Result<Vec<TaskInstance>, BackendError>;

    async fn load_definition(
        &self,
        project_code: ProjectCode,
        definition_code: i64,
    ) -> Result<WorkflowDefinition, BackendError>;
}

/// Error types for backend calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Backend error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("Deserialization error: {0}")]
    Decode(String),
    #[error("Requested {requested} task codes, received {received}")]
    CodeCountMismatch { requested: usize, received: usize },
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        let (category, code) = match &err {
            BackendError::Decode(_) => (ErrorCategory::SerializationError, "BACKEND_DECODE"),
            BackendError::InvalidUrl(_) => (ErrorCategory::ConfigError, "BACKEND_URL"),
            BackendError::Api { .. } => (ErrorCategory::NetworkError, "BACKEND_API"),
            _ => (ErrorCategory::NetworkError, "BACKEND_UNAVAILABLE"),
        };
        AppError::new(category, err.to_string()).with_code(code)
    }
}
