//! Wire format exchanged with the scheduler backend.
//!
//! These types mirror the REST payloads one-to-one. Anything the editor does
//! not interpret is kept in a flattened `extra` map so that a definition loaded
//! and saved again without edits reproduces the original task payloads.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-assigned task identity (64-bit, unique within a project).
pub type TaskCode = i64;
/// Project identity used to scope every backend call.
pub type ProjectCode = i64;

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn code_from_value<E: de::Error>(value: Value) -> Result<i64, E> {
    match value {
        Value::Null => Ok(0),
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| E::custom(format!("task code {} is not a 64-bit integer", number))),
        Value::String(text) if text.trim().is_empty() => Ok(0),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("task code '{}' is not numeric", text))),
        other => Err(E::custom(format!("unexpected task code {}", other))),
    }
}

/// Codes arrive as JSON numbers, numeric strings, or `null` (read as `0`).
pub(crate) fn deserialize_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    code_from_value(value)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Task type tag; selects the node icon and type-specific connection rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Shell,
    SubProcess,
    Procedure,
    Sql,
    Spark,
    Flink,
    Mr,
    Python,
    Dependent,
    Http,
    DataX,
    Pigeon,
    Sqoop,
    Conditions,
    Switch,
    SeaTunnel,
    Emr,
    K8s,
    /// Plugin task types the editor has no special handling for.
    Other(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Shell => "SHELL",
            TaskType::SubProcess => "SUB_PROCESS",
            TaskType::Procedure => "PROCEDURE",
            TaskType::Sql => "SQL",
            TaskType::Spark => "SPARK",
            TaskType::Flink => "FLINK",
            TaskType::Mr => "MR",
            TaskType::Python => "PYTHON",
            TaskType::Dependent => "DEPENDENT",
            TaskType::Http => "HTTP",
            TaskType::DataX => "DATAX",
            TaskType::Pigeon => "PIGEON",
            TaskType::Sqoop => "SQOOP",
            TaskType::Conditions => "CONDITIONS",
            TaskType::Switch => "SWITCH",
            TaskType::SeaTunnel => "SEATUNNEL",
            TaskType::Emr => "EMR",
            TaskType::K8s => "K8S",
            TaskType::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_conditions(&self) -> bool {
        matches!(self, TaskType::Conditions)
    }
}

impl From<String> for TaskType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SHELL" => TaskType::Shell,
            "SUB_PROCESS" => TaskType::SubProcess,
            "PROCEDURE" => TaskType::Procedure,
            "SQL" => TaskType::Sql,
            "SPARK" => TaskType::Spark,
            "FLINK" => TaskType::Flink,
            "MR" => TaskType::Mr,
            "PYTHON" => TaskType::Python,
            "DEPENDENT" => TaskType::Dependent,
            "HTTP" => TaskType::Http,
            "DATAX" => TaskType::DataX,
            "PIGEON" => TaskType::Pigeon,
            "SQOOP" => TaskType::Sqoop,
            "CONDITIONS" => TaskType::Conditions,
            "SWITCH" => TaskType::Switch,
            "SEATUNNEL" => TaskType::SeaTunnel,
            "EMR" => TaskType::Emr,
            "K8S" => TaskType::K8s,
            _ => TaskType::Other(raw),
        }
    }
}

impl From<&str> for TaskType {
    fn from(raw: &str) -> Self {
        TaskType::from(raw.to_string())
    }
}

impl From<TaskType> for String {
    fn from(task_type: TaskType) -> Self {
        task_type.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enabled (`YES`) or disabled (`NO`) task; disabled tasks only change fill color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskFlag {
    #[default]
    Yes,
    No,
}

/// Relation condition type; the editor always emits `NONE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionType {
    #[default]
    None,
    Judge,
    Delay,
}

/// One task definition as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(deserialize_with = "deserialize_code")]
    pub code: TaskCode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    pub task_type: TaskType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flag: TaskFlag,
    /// Task parameters and every other field the editor does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDefinition {
    /// Minimal definition used for a freshly dropped node.
    pub fn new(code: TaskCode, task_type: TaskType) -> Self {
        Self {
            code,
            name: String::new(),
            version: None,
            task_type,
            flag: TaskFlag::Yes,
            extra: Map::new(),
        }
    }

    pub fn task_params(&self) -> Option<&Value> {
        self.extra.get("taskParams")
    }
}

/// Process-level metadata of a workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    #[serde(default, deserialize_with = "deserialize_code")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON string of `Location[]` (older servers send the array directly).
    #[serde(default)]
    pub locations: Value,
    #[serde(default)]
    pub global_params: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcessDefinition {
    /// Decode the embedded location side-table.
    pub fn parsed_locations(&self) -> Result<Vec<Location>, serde_json::Error> {
        match &self.locations {
            Value::Null => Ok(Vec::new()),
            Value::String(text) if text.trim().is_empty() => Ok(Vec::new()),
            Value::String(text) => serde_json::from_str(text),
            other => serde_json::from_value(other.clone()),
        }
    }
}

/// Authoritative persisted form of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub process_definition: ProcessDefinition,
    #[serde(default)]
    pub process_task_relation_list: Vec<Relation>,
    #[serde(default)]
    pub task_definition_list: Vec<TaskDefinition>,
}

/// Dependency record: `post` depends on `pre`; `pre == 0` marks a head task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_code")]
    pub pre_task_code: TaskCode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pre_task_version: i32,
    #[serde(deserialize_with = "deserialize_code")]
    pub post_task_code: TaskCode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub post_task_version: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub condition_type: ConditionType,
    #[serde(default = "empty_object")]
    pub condition_params: Value,
}

impl Relation {
    pub fn new(
        name: impl Into<String>,
        pre_task_code: TaskCode,
        pre_task_version: i32,
        post_task_code: TaskCode,
        post_task_version: i32,
    ) -> Self {
        Self {
            name: name.into(),
            pre_task_code,
            pre_task_version,
            post_task_code,
            post_task_version,
            condition_type: ConditionType::None,
            condition_params: empty_object(),
        }
    }

    pub fn is_head(&self) -> bool {
        self.pre_task_code == 0
    }
}

/// Canvas coordinates of one task, persisted apart from the task payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(deserialize_with = "deserialize_code")]
    pub task_code: TaskCode,
    pub x: f64,
    pub y: f64,
}

/// Process-level form values sent along with a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub global_params: Value,
    #[serde(default)]
    pub timeout: i64,
    #[serde(default = "default_execution_type")]
    pub execution_type: String,
}

fn default_execution_type() -> String {
    "PARALLEL".to_string()
}

impl SaveForm {
    pub fn from_process(process: &ProcessDefinition) -> Self {
        Self {
            name: process.name.clone(),
            description: process.description.clone().unwrap_or_default(),
            global_params: process.global_params.clone(),
            timeout: process
                .extra
                .get("timeout")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            execution_type: process
                .extra
                .get("executionType")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(default_execution_type),
        }
    }
}

/// Everything the enclosing view needs to persist the edited workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub task_definitions: Vec<TaskDefinition>,
    pub save_form: SaveForm,
    pub connects: Vec<Relation>,
    pub locations: Vec<Location>,
}

/// Execution state of a task instance as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskExecutionState {
    SubmittedSuccess,
    RunningExecution,
    ReadyPause,
    Pause,
    ReadyStop,
    Stop,
    Failure,
    Success,
    NeedFaultTolerance,
    Kill,
    WaitingThread,
    WaitingDepend,
    DelayExecution,
    ForcedSuccess,
    SerialWait,
    Dispatch,
    Other(String),
}

impl TaskExecutionState {
    pub fn as_str(&self) -> &str {
        match self {
            TaskExecutionState::SubmittedSuccess => "SUBMITTED_SUCCESS",
            TaskExecutionState::RunningExecution => "RUNNING_EXECUTION",
            TaskExecutionState::ReadyPause => "READY_PAUSE",
            TaskExecutionState::Pause => "PAUSE",
            TaskExecutionState::ReadyStop => "READY_STOP",
            TaskExecutionState::Stop => "STOP",
            TaskExecutionState::Failure => "FAILURE",
            TaskExecutionState::Success => "SUCCESS",
            TaskExecutionState::NeedFaultTolerance => "NEED_FAULT_TOLERANCE",
            TaskExecutionState::Kill => "KILL",
            TaskExecutionState::WaitingThread => "WAITING_THREAD",
            TaskExecutionState::WaitingDepend => "WAITING_DEPEND",
            TaskExecutionState::DelayExecution => "DELAY_EXECUTION",
            TaskExecutionState::ForcedSuccess => "FORCED_SUCCESS",
            TaskExecutionState::SerialWait => "SERIAL_WAIT",
            TaskExecutionState::Dispatch => "DISPATCH",
            TaskExecutionState::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for TaskExecutionState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "SUBMITTED_SUCCESS" => TaskExecutionState::SubmittedSuccess,
            "RUNNING_EXECUTION" => TaskExecutionState::RunningExecution,
            "READY_PAUSE" => TaskExecutionState::ReadyPause,
            "PAUSE" => TaskExecutionState::Pause,
            "READY_STOP" => TaskExecutionState::ReadyStop,
            "STOP" => TaskExecutionState::Stop,
            "FAILURE" => TaskExecutionState::Failure,
            "SUCCESS" => TaskExecutionState::Success,
            "NEED_FAULT_TOLERANCE" => TaskExecutionState::NeedFaultTolerance,
            "KILL" => TaskExecutionState::Kill,
            "WAITING_THREAD" => TaskExecutionState::WaitingThread,
            "WAITING_DEPEND" => TaskExecutionState::WaitingDepend,
            "DELAY_EXECUTION" => TaskExecutionState::DelayExecution,
            "FORCED_SUCCESS" => TaskExecutionState::ForcedSuccess,
            "SERIAL_WAIT" => TaskExecutionState::SerialWait,
            "DISPATCH" => TaskExecutionState::Dispatch,
            _ => TaskExecutionState::Other(raw),
        }
    }
}

impl From<TaskExecutionState> for String {
    fn from(state: TaskExecutionState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for TaskExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task run inside a workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstance {
    #[serde(default, deserialize_with = "deserialize_code")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_code")]
    pub task_code: TaskCode,
    pub state: TaskExecutionState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
