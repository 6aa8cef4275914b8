//! In-memory graph of tasks and dependencies, independent of any renderer.
//!
//! The model only enforces structural sanity (known endpoints, no self loops,
//! no parallel edges). Acyclicity and type-specific fan-out limits are checked
//! by [`crate::core::dag::validator`] before the editor calls [`GraphModel::add_edge`].

use crate::core::dag::schema::{TaskCode, TaskFlag, TaskType};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use petgraph::algo::is_cyclic_directed;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::fmt;

/// Canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Node weight: the visual facts about one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    pub code: TaskCode,
    pub task_type: TaskType,
    pub name: String,
    pub flag: TaskFlag,
    pub position: Position,
}

/// Edge weight: `post` depends on `pre`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyEdge {
    pub pre: TaskCode,
    pub post: TaskCode,
    /// Branch label ("success"/"failure" on condition edges), empty otherwise.
    pub label: String,
}

/// Mutation notifications delivered to the render adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(TaskCode),
    NodeUpdated(TaskCode),
    NodeMoved { code: TaskCode, position: Position },
    NodeRemoved(TaskCode),
    EdgeAdded { pre: TaskCode, post: TaskCode },
    EdgeLabelChanged { pre: TaskCode, post: TaskCode },
    EdgeRemoved { pre: TaskCode, post: TaskCode },
    Cleared,
}

/// Render-on-mutation hook; the only coupling between the model and a renderer.
pub trait GraphListener: Send {
    fn on_event(&mut self, event: &GraphEvent);
}

impl<F> GraphListener for F
where
    F: FnMut(&GraphEvent) + Send,
{
    fn on_event(&mut self, event: &GraphEvent) {
        self(event)
    }
}

/// Structural refusals raised by the model itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("task {0} already exists on the canvas")]
    DuplicateNode(TaskCode),
    #[error("task {0} is not on the canvas")]
    UnknownNode(TaskCode),
    #[error("task {0} cannot depend on itself")]
    SelfLoop(TaskCode),
    #[error("dependency {pre} -> {post} already exists")]
    DuplicateEdge { pre: TaskCode, post: TaskCode },
    #[error("dependency {pre} -> {post} does not exist")]
    UnknownEdge { pre: TaskCode, post: TaskCode },
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::new(ErrorCategory::ValidationError, err.to_string()).with_code("MODEL_REJECTED")
    }
}

#[derive(Default)]
pub struct GraphModel {
    graph: StableDiGraph<TaskNode, DependencyEdge>,
    index: IndexMap<TaskCode, NodeIndex>,
    listeners: Vec<Box<dyn GraphListener>>,
}

impl fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphModel")
            .field("nodes", &self.index.len())
            .field("edges", &self.graph.edge_count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L: GraphListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: GraphEvent) {
        for listener in self.listeners.iter_mut() {
            listener.on_event(&event);
        }
    }

    fn node_index(&self, code: TaskCode) -> Result<NodeIndex, ModelError> {
        self.index
            .get(&code)
            .copied()
            .ok_or(ModelError::UnknownNode(code))
    }

    pub fn add_node(
        &mut self,
        code: TaskCode,
        task_type: TaskType,
        name: impl Into<String>,
        flag: TaskFlag,
        position: Position,
    ) -> Result<(), ModelError> {
        if self.index.contains_key(&code) {
            tracing::warn!(task_code = code, "refusing duplicate node");
            return Err(ModelError::DuplicateNode(code));
        }
        let idx = self.graph.add_node(TaskNode {
            code,
            task_type,
            name: name.into(),
            flag,
            position,
        });
        self.index.insert(code, idx);
        tracing::debug!(task_code = code, "node added");
        self.emit(GraphEvent::NodeAdded(code));
        Ok(())
    }

    /// Remove a node and every edge touching it. Edge removals are emitted first.
    pub fn remove_node(&mut self, code: TaskCode) -> Result<TaskNode, ModelError> {
        let idx = self.node_index(code)?;
        let touching: Vec<(TaskCode, TaskCode)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .chain(self.graph.edges_directed(idx, Direction::Outgoing))
            .map(|edge| (edge.weight().pre, edge.weight().post))
            .collect();
        for (pre, post) in touching {
            self.remove_edge(pre, post)?;
        }
        self.index.shift_remove(&code);
        let node = self
            .graph
            .remove_node(idx)
            .ok_or(ModelError::UnknownNode(code))?;
        tracing::debug!(task_code = code, "node removed");
        self.emit(GraphEvent::NodeRemoved(code));
        Ok(node)
    }

    /// Update the display attributes of an existing node.
    pub fn update_node(
        &mut self,
        code: TaskCode,
        name: impl Into<String>,
        flag: TaskFlag,
        task_type: TaskType,
    ) -> Result<(), ModelError> {
        let idx = self.node_index(code)?;
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.name = name.into();
            node.flag = flag;
            node.task_type = task_type;
        }
        self.emit(GraphEvent::NodeUpdated(code));
        Ok(())
    }

    pub fn set_position(&mut self, code: TaskCode, position: Position) -> Result<(), ModelError> {
        let idx = self.node_index(code)?;
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.position = position;
        }
        self.emit(GraphEvent::NodeMoved { code, position });
        Ok(())
    }

    pub fn add_edge(
        &mut self,
        pre: TaskCode,
        post: TaskCode,
        label: Option<&str>,
    ) -> Result<(), ModelError> {
        if pre == post {
            return Err(ModelError::SelfLoop(pre));
        }
        let from = self.node_index(pre)?;
        let to = self.node_index(post)?;
        if self.graph.find_edge(from, to).is_some() {
            return Err(ModelError::DuplicateEdge { pre, post });
        }
        self.graph.add_edge(
            from,
            to,
            DependencyEdge {
                pre,
                post,
                label: label.unwrap_or_default().to_string(),
            },
        );
        tracing::debug!(pre, post, "edge added");
        self.emit(GraphEvent::EdgeAdded { pre, post });
        Ok(())
    }

    pub fn remove_edge(
        &mut self,
        pre: TaskCode,
        post: TaskCode,
    ) -> Result<DependencyEdge, ModelError> {
        let from = self.node_index(pre)?;
        let to = self.node_index(post)?;
        let edge_idx = self
            .graph
            .find_edge(from, to)
            .ok_or(ModelError::UnknownEdge { pre, post })?;
        let edge = self
            .graph
            .remove_edge(edge_idx)
            .ok_or(ModelError::UnknownEdge { pre, post })?;
        tracing::debug!(pre, post, "edge removed");
        self.emit(GraphEvent::EdgeRemoved { pre, post });
        Ok(edge)
    }

    pub fn set_edge_label(
        &mut self,
        pre: TaskCode,
        post: TaskCode,
        label: impl Into<String>,
    ) -> Result<(), ModelError> {
        let from = self.node_index(pre)?;
        let to = self.node_index(post)?;
        let edge_idx = self
            .graph
            .find_edge(from, to)
            .ok_or(ModelError::UnknownEdge { pre, post })?;
        if let Some(edge) = self.graph.edge_weight_mut(edge_idx) {
            edge.label = label.into();
        }
        self.emit(GraphEvent::EdgeLabelChanged { pre, post });
        Ok(())
    }

    /// Drop every node and edge. Listeners receive a single `Cleared` event.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
        self.emit(GraphEvent::Cleared);
    }

    pub fn get_node(&self, code: TaskCode) -> Option<&TaskNode> {
        self.index
            .get(&code)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn contains(&self, code: TaskCode) -> bool {
        self.index.contains_key(&code)
    }

    pub fn edge(&self, pre: TaskCode, post: TaskCode) -> Option<&DependencyEdge> {
        let from = *self.index.get(&pre)?;
        let to = *self.index.get(&post)?;
        self.graph
            .find_edge(from, to)
            .and_then(|idx| self.graph.edge_weight(idx))
    }

    fn edges_in_direction(&self, code: TaskCode, direction: Direction) -> Vec<&DependencyEdge> {
        let Some(idx) = self.index.get(&code) else {
            return Vec::new();
        };
        let mut edges: Vec<&DependencyEdge> = self
            .graph
            .edges_directed(*idx, direction)
            .map(|edge| edge.weight())
            .collect();
        edges.sort_by_key(|edge| (edge.pre, edge.post));
        edges
    }

    /// Edges ending at `code`, ordered by `(pre, post)`.
    pub fn get_incoming(&self, code: TaskCode) -> Vec<&DependencyEdge> {
        self.edges_in_direction(code, Direction::Incoming)
    }

    /// Edges starting at `code`, ordered by `(pre, post)`.
    pub fn get_outgoing(&self, code: TaskCode) -> Vec<&DependencyEdge> {
        self.edges_in_direction(code, Direction::Outgoing)
    }

    /// Nodes in insertion order.
    pub fn all_nodes(&self) -> Vec<&TaskNode> {
        self.index
            .values()
            .filter_map(|idx| self.graph.node_weight(*idx))
            .collect()
    }

    pub fn all_edges(&self) -> Vec<&DependencyEdge> {
        self.graph
            .edge_indices()
            .filter_map(|idx| self.graph.edge_weight(idx))
            .collect()
    }

    pub fn codes(&self) -> Vec<TaskCode> {
        self.index.keys().copied().collect()
    }

    /// Nodes without any incoming edge.
    pub fn head_nodes(&self) -> Vec<&TaskNode> {
        self.index
            .values()
            .filter(|idx| {
                self.graph
                    .edges_directed(**idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(*idx))
            .collect()
    }

    /// Case-insensitive name search used to locate a node on a large canvas.
    pub fn find_by_name(&self, query: &str) -> Vec<&TaskNode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.all_nodes()
            .into_iter()
            .filter(|node| node.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    pub(crate) fn graph(&self) -> &StableDiGraph<TaskNode, DependencyEdge> {
        &self.graph
    }

    pub(crate) fn index_of(&self, code: TaskCode) -> Option<NodeIndex> {
        self.index.get(&code).copied()
    }
}
