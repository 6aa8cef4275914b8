//! Pending-node state machine: drag, allocate, configure, confirm or discard.
//!
//! A node enters the graph only after its code has come back from the backend.
//! [`AllocatedNode`] can only be built by [`NodeLifecycle::allocate`], so the
//! model never holds a placeholder code.

use crate::backend::{Backend, BackendError};
use crate::core::dag::model::{GraphModel, ModelError, Position};
use crate::core::dag::schema::{ProjectCode, TaskCode, TaskDefinition, TaskFlag, TaskType};
use crate::core::dag::validator::{
    ConnectRejection, ConnectionValidator, CONDITIONS_MAX_OUTGOING,
};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const SUCCESS_LABEL: &str = "success";
pub const FAILURE_LABEL: &str = "failure";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Dragging,
    PendingConfiguration,
    Editing,
    Confirmed,
    Discarded,
}

/// A sidebar item being dragged. Dropping it outside the canvas is just `drop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    task_type: TaskType,
}

impl DragSession {
    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::Dragging
    }
}

/// A dropped item whose task code has been allocated by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedNode {
    code: TaskCode,
    task_type: TaskType,
    position: Position,
}

impl AllocatedNode {
    pub fn code(&self) -> TaskCode {
        self.code
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit,
}

/// What the task-configuration dialog is opened with.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogRequest {
    pub code: TaskCode,
    pub mode: DialogMode,
    pub definition: TaskDefinition,
    /// Current predecessors, preselected in the dialog's pre-task list.
    pub pre_tasks: Vec<TaskCode>,
}

/// Confirmed dialog content. `pre_tasks` replaces the node's incoming edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedTask {
    pub definition: TaskDefinition,
    pub pre_tasks: Vec<TaskCode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    Confirm(ConfirmedTask),
    Cancel,
}

/// External task-configuration dialog.
#[async_trait]
pub trait TaskDialog: Send {
    async fn open(&mut self, request: DialogRequest) -> DialogOutcome;
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("no configuration dialog is open for task {0}")]
    NoOpenDialog(TaskCode),
    #[error("task {0} has not been configured yet")]
    NotConfirmed(TaskCode),
    #[error("task name is required")]
    EmptyName,
    #[error("task name '{0}' is already used in this workflow")]
    DuplicateTaskName(String),
    #[error(transparent)]
    Rejected(#[from] ConnectRejection),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("task code allocation failed: {0}")]
    Allocation(#[from] BackendError),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Allocation(source) => AppError::with_source(
                ErrorCategory::NetworkError,
                "task code allocation failed",
                Box::new(source),
            )
            .with_code("ALLOCATION_FAILED")
            .with_suggestion("Check the backend connection and drop the task again"),
            LifecycleError::Rejected(rejection) => rejection.into(),
            state @ (LifecycleError::NoOpenDialog(_) | LifecycleError::NotConfirmed(_)) => {
                AppError::new(ErrorCategory::InternalError, state.to_string())
                    .with_code("LIFECYCLE_STATE")
            }
            other => AppError::new(ErrorCategory::ValidationError, other.to_string())
                .with_code("TASK_REJECTED"),
        }
    }
}

/// Tracks the lifecycle state of every node created or edited in a session.
#[derive(Debug)]
pub struct NodeLifecycle {
    states: HashMap<TaskCode, LifecycleState>,
    copy_offset: (f64, f64),
}

impl Default for NodeLifecycle {
    fn default() -> Self {
        Self::new((100.0, 100.0))
    }
}

impl NodeLifecycle {
    pub fn new(copy_offset: (f64, f64)) -> Self {
        Self {
            states: HashMap::new(),
            copy_offset,
        }
    }

    /// Forget every tracked node; loaded nodes count as confirmed.
    pub fn reset(&mut self, confirmed: impl IntoIterator<Item = TaskCode>) {
        self.states = confirmed
            .into_iter()
            .map(|code| (code, LifecycleState::Confirmed))
            .collect();
    }

    pub fn state(&self, code: TaskCode) -> Option<LifecycleState> {
        self.states.get(&code).copied()
    }

    pub fn forget(&mut self, code: TaskCode) {
        self.states.remove(&code);
    }

    pub fn begin_drag(task_type: TaskType) -> DragSession {
        tracing::debug!(task_type = %task_type, "drag started");
        DragSession { task_type }
    }

    /// Request exactly one code for a dropped item.
    pub async fn allocate(
        backend: &dyn Backend,
        project_code: ProjectCode,
        session: DragSession,
        position: Position,
    ) -> Result<AllocatedNode, AppError> {
        let code = allocate_one(backend, project_code).await?;
        tracing::debug!(task_code = code, "task code allocated");
        Ok(AllocatedNode {
            code,
            task_type: session.task_type,
            position,
        })
    }

    /// Add the allocated node with an empty name and open the dialog for it.
    pub fn materialize(
        &mut self,
        model: &mut GraphModel,
        allocated: AllocatedNode,
    ) -> Result<DialogRequest, AppError> {
        let AllocatedNode {
            code,
            task_type,
            position,
        } = allocated;
        model
            .add_node(code, task_type.clone(), "", TaskFlag::Yes, position)
            .map_err(LifecycleError::from)?;
        self.states.insert(code, LifecycleState::PendingConfiguration);
        Ok(DialogRequest {
            code,
            mode: DialogMode::Create,
            definition: TaskDefinition::new(code, task_type),
            pre_tasks: Vec::new(),
        })
    }

    /// Reopen the dialog for an existing node (double-click).
    pub fn open_edit(
        &mut self,
        model: &GraphModel,
        definitions: &IndexMap<TaskCode, TaskDefinition>,
        code: TaskCode,
    ) -> Result<DialogRequest, AppError> {
        let node = model
            .get_node(code)
            .ok_or(LifecycleError::Model(ModelError::UnknownNode(code)))?;
        let definition = definitions.get(&code).cloned().unwrap_or_else(|| {
            let mut definition = TaskDefinition::new(code, node.task_type.clone());
            definition.name = node.name.clone();
            definition.flag = node.flag;
            definition
        });
        let mode = match self.state(code) {
            Some(LifecycleState::PendingConfiguration) => DialogMode::Create,
            _ => {
                self.states.insert(code, LifecycleState::Editing);
                DialogMode::Edit
            }
        };
        Ok(DialogRequest {
            code,
            mode,
            definition,
            pre_tasks: model.get_incoming(code).iter().map(|edge| edge.pre).collect(),
        })
    }

    /// Apply the dialog outcome for `code` and return the resulting state.
    pub fn resolve(
        &mut self,
        model: &mut GraphModel,
        definitions: &mut IndexMap<TaskCode, TaskDefinition>,
        code: TaskCode,
        outcome: DialogOutcome,
    ) -> Result<LifecycleState, AppError> {
        let state = match self.state(code) {
            Some(state @ (LifecycleState::PendingConfiguration | LifecycleState::Editing)) => state,
            _ => return Err(LifecycleError::NoOpenDialog(code).into()),
        };
        match outcome {
            DialogOutcome::Cancel if state == LifecycleState::PendingConfiguration => {
                model.remove_node(code).map_err(LifecycleError::from)?;
                self.states.remove(&code);
                tracing::debug!(task_code = code, "pending task discarded");
                Ok(LifecycleState::Discarded)
            }
            DialogOutcome::Cancel => {
                self.states.insert(code, LifecycleState::Confirmed);
                Ok(LifecycleState::Confirmed)
            }
            DialogOutcome::Confirm(task) => {
                confirm(model, definitions, code, task)?;
                self.states.insert(code, LifecycleState::Confirmed);
                Ok(LifecycleState::Confirmed)
            }
        }
    }

    /// Clone a confirmed node under a fresh code. Edges are not copied.
    pub async fn copy_node(
        &mut self,
        backend: &dyn Backend,
        project_code: ProjectCode,
        model: &mut GraphModel,
        definitions: &mut IndexMap<TaskCode, TaskDefinition>,
        code: TaskCode,
    ) -> Result<TaskCode, AppError> {
        let source = model
            .get_node(code)
            .cloned()
            .ok_or(LifecycleError::Model(ModelError::UnknownNode(code)))?;
        let Some(template) = definitions.get(&code).cloned() else {
            return Err(LifecycleError::NotConfirmed(code).into());
        };
        if self.state(code) == Some(LifecycleState::PendingConfiguration) {
            return Err(LifecycleError::NotConfirmed(code).into());
        }

        let new_code = allocate_one(backend, project_code).await?;
        let mut definition = template;
        definition.code = new_code;
        definition.version = None;
        definition.name = unique_copy_name(definitions, &source.name);

        let (dx, dy) = self.copy_offset;
        model
            .add_node(
                new_code,
                definition.task_type.clone(),
                definition.name.clone(),
                definition.flag,
                source.position.offset(dx, dy),
            )
            .map_err(LifecycleError::from)?;
        definitions.insert(new_code, definition);
        self.states.insert(new_code, LifecycleState::Confirmed);
        tracing::info!(source = code, task_code = new_code, "task copied");
        Ok(new_code)
    }
}

async fn allocate_one(backend: &dyn Backend, project_code: ProjectCode) -> Result<TaskCode, AppError> {
    let codes = backend
        .request_task_codes(1, project_code)
        .await
        .map_err(LifecycleError::from)?;
    match codes.as_slice() {
        [code] => Ok(*code),
        _ => Err(LifecycleError::from(BackendError::CodeCountMismatch {
            requested: 1,
            received: codes.len(),
        })
        .into()),
    }
}

fn confirm(
    model: &mut GraphModel,
    definitions: &mut IndexMap<TaskCode, TaskDefinition>,
    code: TaskCode,
    task: ConfirmedTask,
) -> Result<(), LifecycleError> {
    let ConfirmedTask {
        mut definition,
        pre_tasks,
    } = task;
    definition.code = code;
    let name = definition.name.trim().to_string();
    if name.is_empty() {
        return Err(LifecycleError::EmptyName);
    }
    let taken = definitions
        .values()
        .any(|other| other.code != code && other.name == name);
    if taken {
        return Err(LifecycleError::DuplicateTaskName(name));
    }
    if definition.task_type.is_conditions() {
        let outgoing = model.get_outgoing(code).len();
        if outgoing > CONDITIONS_MAX_OUTGOING {
            tracing::warn!(task_code = code, outgoing, "too many branches for a conditions task");
            return Err(ConnectRejection::ConditionsFanOut {
                code,
                limit: CONDITIONS_MAX_OUTGOING,
            }
            .into());
        }
    }
    ConnectionValidator::validate_predecessors(model, code, &pre_tasks)?;

    let mut wanted = Vec::new();
    let mut seen = HashSet::new();
    for pre in pre_tasks {
        if seen.insert(pre) {
            wanted.push(pre);
        }
    }

    let previous: HashMap<TaskCode, String> = model
        .get_incoming(code)
        .into_iter()
        .map(|edge| (edge.pre, edge.label.clone()))
        .collect();
    for pre in previous.keys() {
        model.remove_edge(*pre, code)?;
    }
    for pre in &wanted {
        let label = previous.get(pre).map(String::as_str).filter(|l| !l.is_empty());
        model.add_edge(*pre, code, label)?;
    }

    definition.name = name.clone();
    model.update_node(code, name, definition.flag, definition.task_type.clone())?;
    let conditions_predecessors: Vec<TaskCode> = wanted
        .iter()
        .copied()
        .filter(|pre| {
            model
                .get_node(*pre)
                .is_some_and(|node| node.task_type.is_conditions())
        })
        .collect();
    definitions.insert(code, definition);

    if let Some(definition) = definitions.get(&code) {
        if definition.task_type.is_conditions() {
            label_condition_branches(model, definition)?;
        }
    }
    for pre in conditions_predecessors {
        if let Some(definition) = definitions.get(&pre) {
            label_condition_branches(model, definition)?;
        }
    }
    tracing::debug!(task_code = code, "task confirmed");
    Ok(())
}

/// Label the outgoing edges of a CONDITIONS task from its branch parameters.
/// An edge to a task named in neither branch loses its label.
pub fn label_condition_branches(
    model: &mut GraphModel,
    definition: &TaskDefinition,
) -> Result<(), ModelError> {
    let Some(result) = definition
        .task_params()
        .and_then(|params| params.get("conditionResult"))
    else {
        return Ok(());
    };
    let success = branch_codes(result.get("successNode"));
    let failure = branch_codes(result.get("failedNode"));
    let outgoing: Vec<(TaskCode, bool)> = model
        .get_outgoing(definition.code)
        .iter()
        .map(|edge| (edge.post, edge.label.is_empty()))
        .collect();
    for (post, unlabelled) in outgoing {
        let label = if success.contains(&post) {
            SUCCESS_LABEL
        } else if failure.contains(&post) {
            FAILURE_LABEL
        } else if unlabelled {
            continue;
        } else {
            ""
        };
        model.set_edge_label(definition.code, post, label)?;
    }
    Ok(())
}

fn branch_codes(value: Option<&Value>) -> Vec<TaskCode> {
    let parse = |item: &Value| match item {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(parse).collect(),
        Some(other) => parse(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn unique_copy_name(definitions: &IndexMap<TaskCode, TaskDefinition>, name: &str) -> String {
    let taken: HashSet<&str> = definitions.values().map(|d| d.name.as_str()).collect();
    let base = format!("{}_copy", name);
    if !taken.contains(base.as_str()) {
        return base;
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or(base)
}
