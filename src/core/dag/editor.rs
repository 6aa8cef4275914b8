//! One editing session over one workflow definition.
//!
//! `DagEditor` owns the graph model and everything derived from it. It is
//! created when a workflow view opens and dropped when the view goes away;
//! nothing is shared between sessions.

use crate::backend::Backend;
use crate::core::config::EditorConfig;
use crate::core::dag::bridge::{self, BackfillReport};
use crate::core::dag::layout::{apply_layout, LayoutConfig};
use crate::core::dag::lifecycle::{
    AllocatedNode, DialogOutcome, DialogRequest, DragSession, LifecycleState, NodeLifecycle,
    TaskDialog,
};
use crate::core::dag::model::{GraphListener, GraphModel, Position};
use crate::core::dag::overlay::{OverlayEvent, StatusOverlay};
use crate::core::dag::schema::{
    ProcessDefinition, SavePayload, TaskCode, TaskDefinition, TaskType, WorkflowDefinition,
};
use crate::core::dag::style::{self, CellInteraction, EdgeStyle, NodeStyle, StatusBadge};
use crate::core::dag::validator::{ConnectDecision, ConnectionValidator};
use crate::core::error::{AppError, Notifier};
use crate::core::types::{EditorMode, ErrorCategory};
use indexmap::IndexMap;
use std::sync::Arc;

/// A node or edge on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellRef {
    Node(TaskCode),
    Edge(TaskCode, TaskCode),
}

impl CellRef {
    fn touches(&self, code: TaskCode) -> bool {
        match *self {
            CellRef::Node(c) => c == code,
            CellRef::Edge(pre, post) => pre == code || post == code,
        }
    }
}

pub struct DagEditor {
    config: EditorConfig,
    mode: EditorMode,
    model: GraphModel,
    definitions: IndexMap<TaskCode, TaskDefinition>,
    process: ProcessDefinition,
    persisted_labels: bool,
    lifecycle: NodeLifecycle,
    overlay: StatusOverlay,
    hovered: Option<CellRef>,
    selected: Option<CellRef>,
    notifier: Arc<dyn Notifier>,
}

impl DagEditor {
    pub fn new(config: EditorConfig, notifier: Arc<dyn Notifier>) -> Self {
        let lifecycle = NodeLifecycle::new(config.editor.copy_offset());
        DagEditor {
            config,
            mode: EditorMode::Edit,
            model: GraphModel::new(),
            definitions: IndexMap::new(),
            process: ProcessDefinition::default(),
            persisted_labels: false,
            lifecycle,
            overlay: StatusOverlay::new(),
            hovered: None,
            selected: None,
            notifier,
        }
    }

    pub fn with_mode(mut self, mode: EditorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// Attach a render-on-mutation listener to the model.
    pub fn subscribe<L: GraphListener + 'static>(&mut self, listener: L) {
        self.model.subscribe(listener);
    }

    pub fn definitions(&self) -> &IndexMap<TaskCode, TaskDefinition> {
        &self.definitions
    }

    pub fn definition(&self, code: TaskCode) -> Option<&TaskDefinition> {
        self.definitions.get(&code)
    }

    pub fn process(&self) -> &ProcessDefinition {
        &self.process
    }

    pub fn overlay(&self) -> &StatusOverlay {
        &self.overlay
    }

    pub fn lifecycle_state(&self, code: TaskCode) -> Option<LifecycleState> {
        self.lifecycle.state(code)
    }

    fn project_code(&self) -> i64 {
        self.config.backend.project_code
    }

    fn ensure_editable(&self) -> Result<(), AppError> {
        if self.mode.is_readonly() {
            tracing::warn!("mutation refused in read-only mode");
            return Err(
                AppError::new(ErrorCategory::ValidationError, "the workflow is read-only")
                    .with_code("READONLY"),
            );
        }
        Ok(())
    }

    /// Replace the session content with `definition`.
    pub fn load(&mut self, definition: WorkflowDefinition) -> Result<BackfillReport, AppError> {
        let report = bridge::backfill(&mut self.model, &definition, &self.config.layout)?;
        let WorkflowDefinition {
            process_definition,
            task_definition_list,
            ..
        } = definition;
        self.definitions = task_definition_list
            .into_iter()
            .filter(|task| self.model.contains(task.code))
            .map(|task| (task.code, task))
            .collect();
        self.process = process_definition;
        self.persisted_labels = report.labelled_relations;
        self.lifecycle.reset(self.model.codes());
        self.overlay.clear();
        self.hovered = None;
        self.selected = None;
        Ok(report)
    }

    /// Produce the save payload. Nothing is sent; the caller persists it.
    pub fn save(&self) -> Result<SavePayload, AppError> {
        match bridge::serialize(
            &self.model,
            &self.definitions,
            &self.process,
            self.persisted_labels,
        ) {
            Ok(payload) => {
                tracing::info!(
                    tasks = payload.task_definitions.len(),
                    relations = payload.connects.len(),
                    "save payload built"
                );
                Ok(payload)
            }
            Err(err) => {
                if err.category == ErrorCategory::CorruptGraph {
                    self.notifier
                        .notify_warning(&format!("Save blocked: {}", err.message));
                } else {
                    self.notifier.notify_error(&err);
                }
                Err(err)
            }
        }
    }

    pub fn can_connect(&self, pre: TaskCode, post: TaskCode) -> ConnectDecision {
        ConnectionValidator::can_connect(&self.model, pre, post)
    }

    /// Validate and add a dependency. A refusal leaves the model untouched.
    pub fn connect(
        &mut self,
        pre: TaskCode,
        post: TaskCode,
        label: Option<&str>,
    ) -> Result<(), AppError> {
        self.ensure_editable()?;
        if let Err(rejection) = self.can_connect(pre, post).into_result() {
            tracing::warn!(pre, post, reason = %rejection, "connection refused");
            return Err(rejection.into());
        }
        self.model.add_edge(pre, post, label)?;
        Ok(())
    }

    pub fn remove_edge(&mut self, pre: TaskCode, post: TaskCode) -> Result<(), AppError> {
        self.ensure_editable()?;
        self.model.remove_edge(pre, post)?;
        let cell = Some(CellRef::Edge(pre, post));
        if self.selected == cell {
            self.selected = None;
        }
        if self.hovered == cell {
            self.hovered = None;
        }
        Ok(())
    }

    /// Remove a node, its edges, its definition and its badge.
    pub fn remove_node(&mut self, code: TaskCode) -> Result<(), AppError> {
        self.ensure_editable()?;
        self.model.remove_node(code)?;
        self.definitions.shift_remove(&code);
        self.lifecycle.forget(code);
        self.overlay.remove(code);
        if self.selected.is_some_and(|cell| cell.touches(code)) {
            self.selected = None;
        }
        if self.hovered.is_some_and(|cell| cell.touches(code)) {
            self.hovered = None;
        }
        Ok(())
    }

    pub fn move_node(&mut self, code: TaskCode, position: Position) -> Result<(), AppError> {
        self.ensure_editable()?;
        self.model.set_position(code, position)?;
        Ok(())
    }

    /// Re-layout every node, with `config` or the session default.
    pub fn layout(&mut self, config: Option<&LayoutConfig>) -> Result<(), AppError> {
        self.ensure_editable()?;
        let config = config.unwrap_or(&self.config.layout).clone();
        apply_layout(&mut self.model, &config);
        Ok(())
    }

    fn cell_exists(&self, cell: CellRef) -> bool {
        match cell {
            CellRef::Node(code) => self.model.contains(code),
            CellRef::Edge(pre, post) => self.model.edge(pre, post).is_some(),
        }
    }

    pub fn hover(&mut self, cell: Option<CellRef>) {
        self.hovered = cell.filter(|c| self.cell_exists(*c));
    }

    pub fn select(&mut self, cell: CellRef) -> bool {
        if !self.cell_exists(cell) {
            return false;
        }
        self.selected = Some(cell);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<CellRef> {
        self.selected
    }

    pub fn interaction(&self, cell: CellRef) -> CellInteraction {
        CellInteraction {
            hovered: self.hovered == Some(cell),
            selected: self.selected == Some(cell),
        }
    }

    pub fn node_style(&self, code: TaskCode) -> Option<NodeStyle> {
        let node = self.model.get_node(code)?;
        Some(style::node_style(
            node,
            self.interaction(CellRef::Node(code)),
            self.overlay.state(code),
        ))
    }

    pub fn edge_style(&self, pre: TaskCode, post: TaskCode) -> Option<EdgeStyle> {
        let edge = self.model.edge(pre, post)?;
        Some(style::edge_style(
            edge,
            self.interaction(CellRef::Edge(pre, post)),
        ))
    }

    pub fn begin_drag(&self, task_type: TaskType) -> Result<DragSession, AppError> {
        self.ensure_editable()?;
        Ok(NodeLifecycle::begin_drag(task_type))
    }

    /// Add an allocated node to the canvas and open its dialog.
    pub fn materialize(&mut self, allocated: AllocatedNode) -> Result<DialogRequest, AppError> {
        self.ensure_editable()?;
        self.lifecycle.materialize(&mut self.model, allocated)
    }

    /// Allocate a code for a dropped sidebar item, then materialize it.
    pub async fn drop_item(
        &mut self,
        backend: &dyn Backend,
        session: DragSession,
        position: Position,
    ) -> Result<DialogRequest, AppError> {
        self.ensure_editable()?;
        let allocated =
            match NodeLifecycle::allocate(backend, self.project_code(), session, position).await {
                Ok(allocated) => allocated,
                Err(err) => {
                    self.notifier.notify_error(&err);
                    return Err(err);
                }
            };
        self.materialize(allocated)
    }

    pub fn open_edit(&mut self, code: TaskCode) -> Result<DialogRequest, AppError> {
        self.lifecycle
            .open_edit(&self.model, &self.definitions, code)
    }

    pub fn resolve_dialog(
        &mut self,
        code: TaskCode,
        outcome: DialogOutcome,
    ) -> Result<LifecycleState, AppError> {
        // Cancelling an edit is the only resolution that leaves the graph alone.
        let discards_pending =
            self.lifecycle.state(code) == Some(LifecycleState::PendingConfiguration);
        if matches!(outcome, DialogOutcome::Confirm(_)) || discards_pending {
            self.ensure_editable()?;
        }
        self.lifecycle
            .resolve(&mut self.model, &mut self.definitions, code, outcome)
    }

    /// Open `dialog` with `request` and apply whatever it returns.
    pub async fn configure_with(
        &mut self,
        dialog: &mut dyn TaskDialog,
        request: DialogRequest,
    ) -> Result<LifecycleState, AppError> {
        let code = request.code;
        let outcome = dialog.open(request).await;
        self.resolve_dialog(code, outcome)
    }

    pub async fn copy_node(
        &mut self,
        backend: &dyn Backend,
        code: TaskCode,
    ) -> Result<TaskCode, AppError> {
        self.ensure_editable()?;
        let project_code = self.project_code();
        let result = self
            .lifecycle
            .copy_node(
                backend,
                project_code,
                &mut self.model,
                &mut self.definitions,
                code,
            )
            .await;
        if let Err(err) = &result {
            if err.category == ErrorCategory::NetworkError {
                self.notifier.notify_error(err);
            }
        }
        result
    }

    /// Fetch task states for `instance_id` and refresh the badges.
    pub async fn refresh_status(
        &mut self,
        backend: &dyn Backend,
        instance_id: i64,
    ) -> Result<bool, AppError> {
        let project_code = self.project_code();
        self.overlay
            .refresh(
                &self.model,
                backend,
                instance_id,
                project_code,
                self.notifier.as_ref(),
            )
            .await
    }

    /// Apply one event from an [`crate::core::dag::overlay::OverlayPoller`].
    pub fn apply_overlay_event(&mut self, event: OverlayEvent) -> bool {
        match event {
            OverlayEvent::Snapshot(instances) => self.overlay.apply(&self.model, &instances),
            OverlayEvent::FetchFailed(message) => {
                let error = AppError::new(ErrorCategory::NetworkError, message)
                    .with_code("STATUS_POLL_FAILED");
                self.notifier.notify_error(&error);
                false
            }
        }
    }

    pub fn status(&self, code: TaskCode) -> Option<&StatusBadge> {
        self.overlay.badge(code)
    }

    /// Select the first node whose name contains `query`.
    pub fn locate(&mut self, query: &str) -> Option<TaskCode> {
        let code = self.model.find_by_name(query).first().map(|node| node.code)?;
        self.selected = Some(CellRef::Node(code));
        Some(code)
    }
}
