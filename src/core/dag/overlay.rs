//! Execution status badges for a running or finished workflow instance.
//!
//! The overlay never touches the structural graph. It holds one badge per task
//! code and each refresh replaces the whole map.

use crate::backend::Backend;
use crate::core::dag::model::GraphModel;
use crate::core::dag::schema::{ProjectCode, TaskCode, TaskExecutionState, TaskInstance};
use crate::core::dag::style::StatusBadge;
use crate::core::error::{AppError, Notifier};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    Snapshot(Vec<TaskInstance>),
    FetchFailed(String),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatusOverlay {
    badges: BTreeMap<TaskCode, StatusBadge>,
}

impl StatusOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the badge map from `instances`. Codes missing from the model are
    /// ignored; for a code reported twice the instance with the higher id wins.
    /// Returns whether any badge changed.
    pub fn apply(&mut self, model: &GraphModel, instances: &[TaskInstance]) -> bool {
        let mut latest: BTreeMap<TaskCode, &TaskInstance> = BTreeMap::new();
        for instance in instances {
            if !model.contains(instance.task_code) {
                continue;
            }
            match latest.get(&instance.task_code) {
                Some(existing) if existing.id > instance.id => {}
                _ => {
                    latest.insert(instance.task_code, instance);
                }
            }
        }
        let next: BTreeMap<TaskCode, StatusBadge> = latest
            .into_iter()
            .map(|(code, instance)| (code, StatusBadge::for_state(&instance.state)))
            .collect();
        if next == self.badges {
            return false;
        }
        self.badges = next;
        true
    }

    /// Fetch task states and apply them. On failure the previous badges stay.
    pub async fn refresh(
        &mut self,
        model: &GraphModel,
        backend: &dyn Backend,
        instance_id: i64,
        project_code: ProjectCode,
        notifier: &dyn Notifier,
    ) -> Result<bool, AppError> {
        match backend
            .query_task_list_by_instance(instance_id, project_code)
            .await
        {
            Ok(instances) => Ok(self.apply(model, &instances)),
            Err(err) => {
                tracing::error!(instance_id, error = %err, "task status refresh failed");
                let error = AppError::from(err);
                notifier.notify_error(&error);
                Err(error)
            }
        }
    }

    pub fn badge(&self, code: TaskCode) -> Option<&StatusBadge> {
        self.badges.get(&code)
    }

    pub fn state(&self, code: TaskCode) -> Option<&TaskExecutionState> {
        self.badges.get(&code).map(|badge| &badge.state)
    }

    pub fn badges(&self) -> impl Iterator<Item = (&TaskCode, &StatusBadge)> {
        self.badges.iter()
    }

    pub fn remove(&mut self, code: TaskCode) {
        self.badges.remove(&code);
    }

    pub fn clear(&mut self) {
        self.badges.clear();
    }

    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }
}

/// Poll the instance task list on a fixed interval until the receiver goes away.
pub async fn polling_loop(
    backend: Arc<dyn Backend>,
    instance_id: i64,
    project_code: ProjectCode,
    period: Duration,
    event_tx: UnboundedSender<OverlayEvent>,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let event = match backend
            .query_task_list_by_instance(instance_id, project_code)
            .await
        {
            Ok(instances) => OverlayEvent::Snapshot(instances),
            Err(err) => {
                tracing::error!(instance_id, "polling task states failed: {}", err);
                OverlayEvent::FetchFailed(err.to_string())
            }
        };
        if event_tx.send(event).is_err() {
            tracing::debug!(instance_id, "overlay receiver dropped, polling stopped");
            break;
        }
    }
}

/// Owns the polling task. Stopping or dropping the poller cancels polling.
pub struct OverlayPoller {
    handle: JoinHandle<()>,
}

impl OverlayPoller {
    pub fn spawn(
        backend: Arc<dyn Backend>,
        instance_id: i64,
        project_code: ProjectCode,
        period: Duration,
    ) -> (Self, UnboundedReceiver<OverlayEvent>) {
        let (event_tx, event_rx) = unbounded_channel();
        let handle = tokio::spawn(polling_loop(
            backend,
            instance_id,
            project_code,
            period,
            event_tx,
        ));
        (OverlayPoller { handle }, event_rx)
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for OverlayPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
