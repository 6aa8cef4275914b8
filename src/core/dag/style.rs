//! Visual attributes for canvas cells.
//!
//! Pure functions of (cell, interaction state, execution status); the renderer
//! calls them after every mutation event.

use crate::core::dag::model::{DependencyEdge, TaskNode};
use crate::core::dag::schema::{TaskExecutionState, TaskFlag};
use serde::Serialize;

pub const NODE_WIDTH: f64 = 220.0;
pub const NODE_HEIGHT: f64 = 48.0;
/// Characters of the task name shown on the node before truncation.
pub const LABEL_MAX_CHARS: usize = 18;

const FILL_DEFAULT: &str = "#ffffff";
const FILL_SELECTED: &str = "#EFF4FE";
const FILL_DISABLED: &str = "#f3f3f5";
const STROKE_DEFAULT: &str = "#E7EAEF";
const STROKE_ACTIVE: &str = "#288FFF";
const EDGE_STROKE_DEFAULT: &str = "#999999";
const LABEL_COLOR: &str = "#333333";
const LABEL_COLOR_DISABLED: &str = "#999999";

/// Hover/selection flags of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellInteraction {
    pub hovered: bool,
    pub selected: bool,
}

impl CellInteraction {
    pub fn hovered() -> Self {
        Self {
            hovered: true,
            selected: false,
        }
    }

    pub fn selected() -> Self {
        Self {
            hovered: false,
            selected: true,
        }
    }
}

/// Status badge overlaid on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub state: TaskExecutionState,
    pub color: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

impl StatusBadge {
    pub fn for_state(state: &TaskExecutionState) -> Self {
        let (color, description, icon) = status_appearance(state);
        Self {
            state: state.clone(),
            color,
            description,
            icon,
        }
    }
}

fn status_appearance(state: &TaskExecutionState) -> (&'static str, &'static str, &'static str) {
    match state {
        TaskExecutionState::SubmittedSuccess => ("#A9A9A9", "Submitted", "status-submitted"),
        TaskExecutionState::RunningExecution => ("#0097e0", "Executing", "status-running"),
        TaskExecutionState::ReadyPause => ("#07b1a3", "Ready to pause", "status-ready-pause"),
        TaskExecutionState::Pause => ("#057c72", "Pause", "status-pause"),
        TaskExecutionState::ReadyStop => ("#FE0402", "Ready to stop", "status-ready-stop"),
        TaskExecutionState::Stop => ("#e90101", "Stop", "status-stop"),
        TaskExecutionState::Failure => ("#000000", "Failed", "status-failure"),
        TaskExecutionState::Success => ("#95DF96", "Success", "status-success"),
        TaskExecutionState::NeedFaultTolerance => {
            ("#FF8C00", "Need fault tolerance", "status-fault-tolerance")
        }
        TaskExecutionState::Kill => ("#a70202", "Kill", "status-kill"),
        TaskExecutionState::WaitingThread => ("#912eed", "Waiting for thread", "status-waiting"),
        TaskExecutionState::WaitingDepend => {
            ("#5101be", "Waiting for dependency", "status-waiting")
        }
        TaskExecutionState::DelayExecution => ("#5102ce", "Delay execution", "status-delay"),
        TaskExecutionState::ForcedSuccess => ("#5102ce", "Forced success", "status-forced"),
        TaskExecutionState::SerialWait => ("#5102ce", "Serial wait", "status-serial-wait"),
        TaskExecutionState::Dispatch => ("#bfbfbf", "Dispatch", "status-dispatch"),
        TaskExecutionState::Other(_) => ("#999999", "Unknown", "status-unknown"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStyle {
    pub width: f64,
    pub height: f64,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f64,
    pub label: String,
    pub label_color: &'static str,
    /// Full task name, shown as tooltip when the label is truncated.
    pub title: String,
    pub icon: String,
    pub badge: Option<StatusBadge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStyle {
    pub stroke: &'static str,
    pub stroke_width: f64,
    pub label: Option<String>,
}

/// Truncate a display string to `max` characters, appending `...`.
pub fn truncate_label(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

pub fn node_style(
    node: &TaskNode,
    interaction: CellInteraction,
    status: Option<&TaskExecutionState>,
) -> NodeStyle {
    let disabled = node.flag == TaskFlag::No;
    let fill = if interaction.selected {
        FILL_SELECTED
    } else if disabled {
        FILL_DISABLED
    } else {
        FILL_DEFAULT
    };
    let stroke = if interaction.selected || interaction.hovered {
        STROKE_ACTIVE
    } else {
        STROKE_DEFAULT
    };
    NodeStyle {
        width: NODE_WIDTH,
        height: NODE_HEIGHT,
        fill,
        stroke,
        stroke_width: if interaction.selected { 2.0 } else { 1.0 },
        label: truncate_label(&node.name, LABEL_MAX_CHARS),
        label_color: if disabled {
            LABEL_COLOR_DISABLED
        } else {
            LABEL_COLOR
        },
        title: node.name.clone(),
        icon: format!("icon-{}", node.task_type.as_str().to_lowercase()),
        badge: status.map(StatusBadge::for_state),
    }
}

pub fn edge_style(edge: &DependencyEdge, interaction: CellInteraction) -> EdgeStyle {
    EdgeStyle {
        stroke: if interaction.selected || interaction.hovered {
            STROKE_ACTIVE
        } else {
            EDGE_STROKE_DEFAULT
        },
        stroke_width: if interaction.selected { 2.0 } else { 1.0 },
        label: (!edge.label.is_empty()).then(|| edge.label.clone()),
    }
}
