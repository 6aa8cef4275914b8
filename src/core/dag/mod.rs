//! Workflow DAG editing core: graph model, connection rules, node lifecycle,
//! layout, persistence bridge and status overlay.

pub mod bridge;
pub mod dot;
pub mod editor;
pub mod layout;
pub mod lifecycle;
pub mod model;
pub mod overlay;
pub mod schema;
pub mod style;
pub mod validator;

pub use bridge::{backfill, get_connects, get_locations, serialize, BackfillReport};
pub use dot::graph_to_dot;
pub use editor::{CellRef, DagEditor};
pub use layout::{apply_layout, compute_layout, tree_fallback, LayoutConfig, LayoutKind};
pub use lifecycle::{
    AllocatedNode, ConfirmedTask, DialogMode, DialogOutcome, DialogRequest, DragSession,
    LifecycleError, LifecycleState, NodeLifecycle, TaskDialog, FAILURE_LABEL, SUCCESS_LABEL,
};
pub use model::{DependencyEdge, GraphEvent, GraphListener, GraphModel, ModelError, Position, TaskNode};
pub use overlay::{polling_loop, OverlayEvent, OverlayPoller, StatusOverlay};
pub use schema::{
    Location, ProcessDefinition, Relation, SaveForm, SavePayload, TaskCode, TaskDefinition,
    TaskExecutionState, TaskFlag, TaskInstance, TaskType, WorkflowDefinition,
};
pub use style::{edge_style, node_style, CellInteraction, EdgeStyle, NodeStyle, StatusBadge};
pub use validator::{
    ConnectDecision, ConnectRejection, ConnectionValidator, CONDITIONS_MAX_OUTGOING,
};
