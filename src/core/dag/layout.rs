//! Auto-layout for the canvas: grid and layered (dagre-style, left to right).
//!
//! Layout is always a full re-layout of the current node set. Positions are
//! computed by a pure function first and then written back to the model, so
//! repeated runs over an unchanged graph yield identical positions.

use crate::core::dag::model::{GraphModel, Position};
use crate::core::dag::schema::TaskCode;
use crate::core::dag::style::{NODE_HEIGHT, NODE_WIDTH};
use indexmap::IndexMap;
use petgraph::algo::toposort;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Extra rank separation when any edge carries a label.
const LABEL_RANK_PADDING: f64 = 100.0;
/// Number of down/up barycenter sweep pairs.
const ORDERING_SWEEPS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Grid,
    #[default]
    Dagre,
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(LayoutKind::Grid),
            "dagre" => Ok(LayoutKind::Dagre),
            other => Err(format!("unknown layout kind '{}' (expected grid or dagre)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub kind: LayoutKind,
    /// Grid columns; derived from the node count when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(default = "default_separation")]
    pub nodesep: f64,
    #[serde(default = "default_separation")]
    pub ranksep: f64,
    #[serde(default = "default_separation")]
    pub padding: f64,
}

fn default_separation() -> f64 {
    50.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            kind: LayoutKind::Dagre,
            cols: None,
            rows: None,
            nodesep: default_separation(),
            ranksep: default_separation(),
            padding: default_separation(),
        }
    }
}

/// Re-layout every node and write the positions back to the model.
pub fn apply_layout(model: &mut GraphModel, config: &LayoutConfig) {
    let positions = compute_layout(model, config);
    write_back(model, positions);
    tracing::info!(kind = ?config.kind, nodes = model.len(), "layout applied");
}

/// Positions for every node, keyed by code in model insertion order.
pub fn compute_layout(model: &GraphModel, config: &LayoutConfig) -> IndexMap<TaskCode, Position> {
    match config.kind {
        LayoutKind::Grid => grid_positions(model, config),
        LayoutKind::Dagre => match layered_positions(model, config) {
            Some(positions) => positions,
            None => {
                tracing::warn!("graph contains a cycle, falling back to grid layout");
                grid_positions(model, config)
            }
        },
    }
}

fn write_back(model: &mut GraphModel, positions: IndexMap<TaskCode, Position>) {
    for (code, position) in positions {
        if let Err(err) = model.set_position(code, position) {
            tracing::warn!(task_code = code, error = %err, "skipping layout position");
        }
    }
}

fn grid_positions(model: &GraphModel, config: &LayoutConfig) -> IndexMap<TaskCode, Position> {
    let codes = model.codes();
    let count = codes.len();
    let cols = match (config.cols, config.rows) {
        (Some(cols), _) => cols,
        (None, Some(rows)) => count.div_ceil(rows.max(1)),
        (None, None) => (count as f64).sqrt().ceil() as usize,
    }
    .max(1);
    let cell_w = NODE_WIDTH + config.nodesep;
    let cell_h = NODE_HEIGHT + config.nodesep;
    codes
        .into_iter()
        .enumerate()
        .map(|(i, code)| {
            let col = (i % cols) as f64;
            let row = (i / cols) as f64;
            (
                code,
                Position::new(config.padding + col * cell_w, config.padding + row * cell_h),
            )
        })
        .collect()
}

/// Longest-path layering plus barycenter ordering. `None` if the graph is cyclic.
fn layered_positions(
    model: &GraphModel,
    config: &LayoutConfig,
) -> Option<IndexMap<TaskCode, Position>> {
    let graph = model.graph();
    let order = toposort(graph, None).ok()?;

    let mut rank: HashMap<TaskCode, usize> = HashMap::new();
    for idx in order {
        let Some(node) = graph.node_weight(idx) else {
            continue;
        };
        let r = model
            .get_incoming(node.code)
            .iter()
            .filter_map(|edge| rank.get(&edge.pre))
            .map(|r| r + 1)
            .max()
            .unwrap_or(0);
        rank.insert(node.code, r);
    }

    let rank_count = rank.values().copied().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<TaskCode>> = vec![Vec::new(); rank_count];
    for code in model.codes() {
        if let Some(r) = rank.get(&code) {
            layers[*r].push(code);
        }
    }
    for layer in layers.iter_mut() {
        layer.sort_by(|a, b| b.cmp(a));
    }

    for _ in 0..ORDERING_SWEEPS {
        for r in 1..layers.len() {
            let (upper, lower) = layers.split_at_mut(r);
            reorder(&mut lower[0], &upper[r - 1], |code| {
                model.get_incoming(code).iter().map(|e| e.pre).collect()
            });
        }
        for r in (0..layers.len().saturating_sub(1)).rev() {
            let (upper, lower) = layers.split_at_mut(r + 1);
            reorder(&mut upper[r], &lower[0], |code| {
                model.get_outgoing(code).iter().map(|e| e.post).collect()
            });
        }
    }

    let labelled = model.all_edges().iter().any(|edge| !edge.label.is_empty());
    let ranksep = if labelled {
        config.ranksep + LABEL_RANK_PADDING
    } else {
        config.ranksep
    };
    let step_x = NODE_WIDTH + ranksep;
    let step_y = NODE_HEIGHT + config.nodesep;
    let tallest = layers.iter().map(Vec::len).max().unwrap_or(0) as f64;

    let mut placed: HashMap<TaskCode, Position> = HashMap::new();
    for (r, layer) in layers.iter().enumerate() {
        let offset = (tallest - layer.len() as f64) * step_y / 2.0;
        for (i, code) in layer.iter().enumerate() {
            placed.insert(
                *code,
                Position::new(
                    config.padding + r as f64 * step_x,
                    config.padding + offset + i as f64 * step_y,
                ),
            );
        }
    }
    Some(
        model
            .codes()
            .into_iter()
            .filter_map(|code| placed.get(&code).map(|p| (code, *p)))
            .collect(),
    )
}

/// Sort `layer` by the mean index of each node's neighbours in `fixed`.
/// Nodes without neighbours keep their current index; ties go to the higher code.
fn reorder<F>(layer: &mut [TaskCode], fixed: &[TaskCode], neighbours: F)
where
    F: Fn(TaskCode) -> Vec<TaskCode>,
{
    let slot: HashMap<TaskCode, usize> = fixed.iter().enumerate().map(|(i, c)| (*c, i)).collect();
    let mut keyed: Vec<(f64, TaskCode)> = layer
        .iter()
        .enumerate()
        .map(|(i, code)| {
            let indices: Vec<usize> = neighbours(*code)
                .iter()
                .filter_map(|n| slot.get(n).copied())
                .collect();
            let key = if indices.is_empty() {
                i as f64
            } else {
                indices.iter().sum::<usize>() as f64 / indices.len() as f64
            };
            (key, *code)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));
    for (dst, (_, code)) in layer.iter_mut().zip(keyed) {
        *dst = code;
    }
}

/// Place nodes as a tree hanging off the head nodes.
///
/// Used when a definition is loaded without any stored locations. Each head
/// starts a subtree; a node sits one column right of its first-visited parent
/// and vertically centred on its children.
pub fn tree_fallback(model: &mut GraphModel, config: &LayoutConfig) {
    let positions = tree_positions(model, config);
    write_back(model, positions);
    tracing::debug!(nodes = model.len(), "tree fallback layout applied");
}

fn tree_positions(model: &GraphModel, config: &LayoutConfig) -> IndexMap<TaskCode, Position> {
    struct Walk<'a> {
        model: &'a GraphModel,
        step_x: f64,
        step_y: f64,
        padding: f64,
        next_row: f64,
        visited: HashSet<TaskCode>,
        placed: HashMap<TaskCode, Position>,
    }

    /// A node whose children are still being walked.
    struct Frame {
        code: TaskCode,
        depth: usize,
        children: Vec<TaskCode>,
        next: usize,
        rows: Vec<f64>,
    }

    impl Walk<'_> {
        fn children(&self, code: TaskCode) -> Vec<TaskCode> {
            self.model
                .get_outgoing(code)
                .iter()
                .map(|edge| edge.post)
                .collect()
        }

        /// Depth-first walk from `root` with an explicit stack, placing each
        /// node once all of its unvisited children are placed.
        fn visit(&mut self, root: TaskCode, depth: usize) {
            self.visited.insert(root);
            let mut stack = vec![Frame {
                code: root,
                depth,
                children: self.children(root),
                next: 0,
                rows: Vec::new(),
            }];
            while let Some(frame) = stack.last_mut() {
                if let Some(&child) = frame.children.get(frame.next) {
                    frame.next += 1;
                    let depth = frame.depth + 1;
                    if self.visited.insert(child) {
                        let children = self.children(child);
                        stack.push(Frame {
                            code: child,
                            depth,
                            children,
                            next: 0,
                            rows: Vec::new(),
                        });
                    }
                    continue;
                }
                let Some(done) = stack.pop() else {
                    break;
                };
                let row = self.place(&done);
                if let Some(parent) = stack.last_mut() {
                    parent.rows.push(row);
                }
            }
        }

        fn place(&mut self, frame: &Frame) -> f64 {
            let row = if frame.rows.is_empty() {
                let row = self.next_row;
                self.next_row += 1.0;
                row
            } else {
                frame.rows.iter().sum::<f64>() / frame.rows.len() as f64
            };
            self.placed.insert(
                frame.code,
                Position::new(
                    self.padding + frame.depth as f64 * self.step_x,
                    self.padding + row * self.step_y,
                ),
            );
            row
        }
    }

    let mut walk = Walk {
        model,
        step_x: NODE_WIDTH + config.ranksep,
        step_y: NODE_HEIGHT + config.nodesep,
        padding: config.padding,
        next_row: 0.0,
        visited: HashSet::new(),
        placed: HashMap::new(),
    };
    let heads: Vec<TaskCode> = model.head_nodes().iter().map(|n| n.code).collect();
    for head in heads {
        if !walk.visited.contains(&head) {
            walk.visit(head, 0);
        }
    }
    // Nodes only reachable through a cycle.
    for code in model.codes() {
        if !walk.visited.contains(&code) {
            walk.visit(code, 0);
        }
    }
    let placed = walk.placed;
    model
        .codes()
        .into_iter()
        .filter_map(|code| placed.get(&code).map(|p| (code, *p)))
        .collect()
}
