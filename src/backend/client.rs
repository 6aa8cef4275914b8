use crate::backend::{Backend, BackendError};
use crate::core::config::BackendConfig;
use crate::core::dag::schema::{
    deserialize_code, ProjectCode, TaskCode, TaskInstance, WorkflowDefinition,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Every API response is wrapped in `{ code, msg, data }`; `code == 0` is success.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct AllocatedCode(#[serde(deserialize_with = "deserialize_code")] TaskCode);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskListData {
    #[serde(default)]
    task_list: Vec<TaskInstance>,
}

/// HTTP client targeting the scheduler REST API.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(HttpBackend {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        Self::new(
            base_url,
            config.token.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.as_str().trim_end_matches('/').to_string();
        for segment in segments {
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }
        url
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.header("token", token);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            tracing::error!(%url, status = status.as_u16(), "backend request failed");
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let envelope: Envelope = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if envelope.code != 0 {
            return Err(BackendError::Api {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_default(),
            });
        }
        serde_json::from_value(envelope.data).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn request_task_codes(
        &self,
        count: usize,
        project_code: ProjectCode,
    ) -> Result<Vec<TaskCode>, BackendError> {
        let project = project_code.to_string();
        let url = self.endpoint(&["projects", &project, "task-definition", "gen-task-codes"]);
        let codes: Vec<AllocatedCode> = self.get_data(url, &[("genNum", count.to_string())]).await?;
        if codes.len() != count {
            return Err(BackendError::CodeCountMismatch {
                requested: count,
                received: codes.len(),
            });
        }
        tracing::debug!(count, project_code, "task codes allocated");
        Ok(codes.into_iter().map(|code| code.0).collect())
    }

    async fn query_task_list_by_instance(
        &self,
        instance_id: i64,
        project_code: ProjectCode,
    ) -> Result<Vec<TaskInstance>, BackendError> {
        let project = project_code.to_string();
        let instance = instance_id.to_string();
        let url = self.endpoint(&["projects", &project, "process-instances", &instance, "tasks"]);
        let data: TaskListData = self.get_data(url, &[]).await?;
        Ok(data.task_list)
    }

    async fn load_definition(
        &self,
        project_code: ProjectCode,
        definition_code: i64,
    ) -> Result<WorkflowDefinition, BackendError> {
        let project = project_code.to_string();
        let definition = definition_code.to_string();
        let url = self.endpoint(&["projects", &project, "process-definition", &definition]);
        self.get_data(url, &[]).await
    }
}
