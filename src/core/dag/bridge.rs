//! Conversion between the persisted `WorkflowDefinition` and the live graph.

use crate::core::dag::layout::{tree_fallback, LayoutConfig};
use crate::core::dag::model::{GraphModel, Position};
use crate::core::dag::schema::{
    Location, ProcessDefinition, Relation, SaveForm, SavePayload, TaskCode, TaskDefinition,
    WorkflowDefinition,
};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::Serialize;

/// What [`backfill`] did with a loaded definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub nodes: usize,
    pub edges: usize,
    pub head_relations: usize,
    /// Relations dropped because an endpoint has no task definition.
    pub skipped_relations: Vec<(TaskCode, TaskCode)>,
    /// At least one loaded relation carried a non-empty name.
    pub labelled_relations: bool,
    pub used_tree_fallback: bool,
}

/// Rebuild `model` from `definition`. The model is cleared first.
pub fn backfill(
    model: &mut GraphModel,
    definition: &WorkflowDefinition,
    layout: &LayoutConfig,
) -> Result<BackfillReport, AppError> {
    let locations = definition
        .process_definition
        .parsed_locations()
        .map_err(|e| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("process definition locations are malformed: {}", e),
            )
            .with_code("BAD_LOCATIONS")
        })?;
    let by_code: IndexMap<TaskCode, Position> = locations
        .iter()
        .map(|loc| (loc.task_code, Position::new(loc.x, loc.y)))
        .collect();
    let default_position = Position::new(layout.padding, layout.padding);

    model.clear();
    let mut report = BackfillReport::default();
    for task in &definition.task_definition_list {
        let position = by_code.get(&task.code).copied().unwrap_or(default_position);
        match model.add_node(
            task.code,
            task.task_type.clone(),
            task.name.clone(),
            task.flag,
            position,
        ) {
            Ok(()) => report.nodes += 1,
            Err(err) => tracing::warn!(task_code = task.code, error = %err, "skipping task"),
        }
    }

    for relation in &definition.process_task_relation_list {
        if !relation.name.is_empty() {
            report.labelled_relations = true;
        }
        if relation.is_head() {
            report.head_relations += 1;
            continue;
        }
        let (pre, post) = (relation.pre_task_code, relation.post_task_code);
        if !model.contains(pre) || !model.contains(post) {
            tracing::warn!(pre, post, "relation references an unknown task, skipping");
            report.skipped_relations.push((pre, post));
            continue;
        }
        let label = Some(relation.name.as_str()).filter(|name| !name.is_empty());
        match model.add_edge(pre, post, label) {
            Ok(()) => report.edges += 1,
            Err(err) => {
                tracing::warn!(pre, post, error = %err, "skipping relation");
                report.skipped_relations.push((pre, post));
            }
        }
    }

    if locations.is_empty() && !model.is_empty() {
        tree_fallback(model, layout);
        report.used_tree_fallback = true;
    }
    tracing::info!(
        nodes = report.nodes,
        edges = report.edges,
        skipped = report.skipped_relations.len(),
        "workflow definition loaded"
    );
    Ok(report)
}

fn version_of(definitions: &IndexMap<TaskCode, TaskDefinition>, code: TaskCode) -> i32 {
    definitions
        .get(&code)
        .and_then(|definition| definition.version)
        .unwrap_or(0)
}

/// Relation records for the current graph: one head relation per node without
/// predecessors, then one relation per edge.
///
/// Refuses when the loaded relations carried labels, definitions exist, yet the
/// graph has neither head nodes nor edges. Validated edits cannot reach that
/// state; it indicates the graph and definitions diverged.
pub fn get_connects(
    model: &GraphModel,
    definitions: &IndexMap<TaskCode, TaskDefinition>,
    persisted_labels: bool,
) -> Result<Vec<Relation>, AppError> {
    let heads = model.head_nodes();
    let edges = model.all_edges();
    if persisted_labels && !definitions.is_empty() && heads.is_empty() && edges.is_empty() {
        tracing::error!(
            definitions = definitions.len(),
            "refusing to serialize: labelled relations but no head nodes or edges"
        );
        return Err(AppError::new(
            ErrorCategory::CorruptGraph,
            "the graph has no start task and no dependencies but the workflow has labelled relations",
        )
        .with_code("CORRUPT_GRAPH")
        .with_suggestion("Reload the workflow definition before saving"));
    }

    let mut connects: Vec<Relation> = heads
        .iter()
        .map(|node| Relation::new("", 0, 0, node.code, version_of(definitions, node.code)))
        .collect();
    connects.extend(edges.iter().map(|edge| {
        Relation::new(
            edge.label.clone(),
            edge.pre,
            version_of(definitions, edge.pre),
            edge.post,
            version_of(definitions, edge.post),
        )
    }));
    Ok(connects)
}

pub fn get_locations(model: &GraphModel) -> Vec<Location> {
    model
        .all_nodes()
        .into_iter()
        .map(|node| Location {
            task_code: node.code,
            x: node.position.x,
            y: node.position.y,
        })
        .collect()
}

/// Build the save payload. Every node must have a confirmed definition.
pub fn serialize(
    model: &GraphModel,
    definitions: &IndexMap<TaskCode, TaskDefinition>,
    process: &ProcessDefinition,
    persisted_labels: bool,
) -> Result<SavePayload, AppError> {
    let mut task_definitions = Vec::with_capacity(model.len());
    for code in model.codes() {
        let Some(definition) = definitions.get(&code) else {
            let mut error = AppError::new(
                ErrorCategory::ValidationError,
                format!("task {} has not been configured", code),
            )
            .with_code("UNCONFIGURED_TASK");
            error.add_context("task_code", &code.to_string());
            return Err(error);
        };
        task_definitions.push(definition.clone());
    }
    let connects = get_connects(model, definitions, persisted_labels)?;
    Ok(SavePayload {
        task_definitions,
        save_form: SaveForm::from_process(process),
        connects,
        locations: get_locations(model),
    })
}
