use crate::core::dag::model::GraphModel;
use crate::core::dag::schema::TaskCode;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use petgraph::algo::has_path_connecting;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashSet;

/// A CONDITIONS task branches to at most a success and a failure successor.
pub const CONDITIONS_MAX_OUTGOING: usize = 2;

/// Why a proposed dependency was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConnectRejection {
    #[error("a task cannot depend on itself")]
    SelfLoop,
    #[error("task {code} is not on the canvas")]
    UnknownNode { code: TaskCode },
    #[error("dependency {pre} -> {post} already exists")]
    DuplicateEdge { pre: TaskCode, post: TaskCode },
    #[error("dependency {pre} -> {post} would create a cycle")]
    WouldCreateCycle { pre: TaskCode, post: TaskCode },
    #[error("conditions task {code} already has {limit} branches")]
    ConditionsFanOut { code: TaskCode, limit: usize },
}

impl From<ConnectRejection> for AppError {
    fn from(rejection: ConnectRejection) -> Self {
        AppError::new(ErrorCategory::ValidationError, rejection.to_string())
            .with_code("CONNECT_REJECTED")
    }
}

/// Outcome of [`ConnectionValidator::can_connect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectDecision {
    pub allowed: bool,
    pub reason: Option<ConnectRejection>,
}

impl ConnectDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn reject(reason: ConnectRejection) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), ConnectRejection> {
        match self.reason {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// Stateless gate run before any dependency is materialized.
pub struct ConnectionValidator;

impl ConnectionValidator {
    /// Decide whether `post` may depend on `pre` given the current graph.
    pub fn can_connect(model: &GraphModel, pre: TaskCode, post: TaskCode) -> ConnectDecision {
        if pre == post {
            return ConnectDecision::reject(ConnectRejection::SelfLoop);
        }
        let (Some(from), Some(to)) = (model.index_of(pre), model.index_of(post)) else {
            let code = if model.contains(pre) { post } else { pre };
            return ConnectDecision::reject(ConnectRejection::UnknownNode { code });
        };
        let graph = model.graph();
        if graph.find_edge(from, to).is_some() {
            return ConnectDecision::reject(ConnectRejection::DuplicateEdge { pre, post });
        }
        if has_path_connecting(graph, to, from, None) {
            return ConnectDecision::reject(ConnectRejection::WouldCreateCycle { pre, post });
        }
        if let Some(rejection) = Self::fan_out_rejection(model, pre, None) {
            return ConnectDecision::reject(rejection);
        }
        ConnectDecision::allow()
    }

    /// Validate a complete predecessor list for `node`, as if its current
    /// incoming edges were replaced by `pre_tasks`. Returns the first refusal.
    pub fn validate_predecessors(
        model: &GraphModel,
        node: TaskCode,
        pre_tasks: &[TaskCode],
    ) -> Result<(), ConnectRejection> {
        let Some(target) = model.index_of(node) else {
            return Err(ConnectRejection::UnknownNode { code: node });
        };
        let graph = model.graph();
        let mut seen = HashSet::new();
        for &pre in pre_tasks {
            if !seen.insert(pre) {
                continue;
            }
            if pre == node {
                return Err(ConnectRejection::SelfLoop);
            }
            let Some(from) = model.index_of(pre) else {
                return Err(ConnectRejection::UnknownNode { code: pre });
            };
            // Paths leaving `node` never use its incoming edges, so the
            // current graph answers the question for the replaced edge set too.
            if has_path_connecting(graph, target, from, None) {
                return Err(ConnectRejection::WouldCreateCycle { pre, post: node });
            }
            if let Some(rejection) = Self::fan_out_rejection(model, pre, Some(node)) {
                return Err(rejection);
            }
        }
        Ok(())
    }

    /// Fan-out limit for CONDITIONS tasks; an existing edge to `replacing` is not counted.
    fn fan_out_rejection(
        model: &GraphModel,
        pre: TaskCode,
        replacing: Option<TaskCode>,
    ) -> Option<ConnectRejection> {
        let node = model.get_node(pre)?;
        if !node.task_type.is_conditions() {
            return None;
        }
        let idx = model.index_of(pre)?;
        let outgoing = model
            .graph()
            .neighbors_directed(idx, Direction::Outgoing)
            .filter_map(|n| model.graph().node_weight(n))
            .filter(|successor| Some(successor.code) != replacing)
            .count();
        if outgoing >= CONDITIONS_MAX_OUTGOING {
            Some(ConnectRejection::ConditionsFanOut {
                code: pre,
                limit: CONDITIONS_MAX_OUTGOING,
            })
        } else {
            None
        }
    }
}
