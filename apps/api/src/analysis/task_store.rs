//! Task registry: one entry per submitted analysis.
//!
//! Each task has a single writer (the orchestrator flow that owns it) and any number
//! of pollers. Readers get cloned snapshots, never references into the map.
//! Transitions out of a terminal state are ignored, so a cancelled task stays
//! cancelled even if its flow finishes the step it was in. Terminal tasks are
//! dropped once they have been finished for longer than the retention period.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::models::profile::Profile;
use crate::models::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub status: TaskStatus,
    pub progress: u8,
    pub profile: Arc<Profile>,
    pub result: Option<Arc<Report>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Monotonic time the task reached a terminal state.
    pub finished_at: Option<Instant>,
}

impl Task {
    fn touch(&mut self) {
        self.updated_at = Utc::now();
        if self.status.is_terminal() && self.finished_at.is_none() {
            self.finished_at = Some(Instant::now());
        }
    }
}

/// Polling payload.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusView {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Arc<Report>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskStatusView {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            progress: task.progress,
            result: task.result.clone(),
            error: task.error.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("task {id} is already {status}")]
    AlreadyTerminal { id: Uuid, status: TaskStatus },
}

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    retention: Duration,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl TaskStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Registers a pending task. Expired terminal tasks are pruned first.
    pub async fn create(&self, profile: Arc<Profile>) -> Uuid {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            status: TaskStatus::Pending,
            progress: 0,
            profile,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        };
        let id = task.id;
        let mut tasks = self.tasks.write().await;
        Self::prune(&mut tasks, self.retention);
        tasks.insert(id, task);
        id
    }

    fn prune(tasks: &mut HashMap<Uuid, Task>, retention: Duration) {
        let before = tasks.len();
        tasks.retain(|_, task| {
            task.finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
        let pruned = before - tasks.len();
        if pruned > 0 {
            debug!(pruned, "expired tasks removed");
        }
    }

    #[cfg(test)]
    pub async fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    pub async fn status_view(&self, id: Uuid) -> Option<TaskStatusView> {
        self.tasks.read().await.get(&id).map(TaskStatusView::from)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Applies `f` if the task exists and is not terminal. Returns whether it applied.
    async fn update(&self, id: Uuid, f: impl FnOnce(&mut Task)) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(task) if !task.status.is_terminal() => {
                f(task);
                task.touch();
                true
            }
            _ => false,
        }
    }

    /// pending → processing, handing back the task's profile. `None` if the task
    /// was cancelled (or pruned) before it started.
    pub async fn begin(&self, id: Uuid) -> Option<Arc<Profile>> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Pending => {
                task.status = TaskStatus::Processing;
                task.touch();
                Some(Arc::clone(&task.profile))
            }
            _ => None,
        }
    }

    /// Progress only moves forward and tops out at 100.
    pub async fn set_progress(&self, id: Uuid, progress: u8) -> bool {
        self.update(id, |task| task.progress = task.progress.max(progress.min(100)))
            .await
    }

    pub async fn complete(&self, id: Uuid, report: Report) -> bool {
        self.update(id, |task| {
            task.status = TaskStatus::Completed;
            task.progress = 100;
            task.result = Some(Arc::new(report));
        })
        .await
    }

    pub async fn fail(&self, id: Uuid, message: impl Into<String>) -> bool {
        let message = message.into();
        self.update(id, |task| {
            task.status = TaskStatus::Failed;
            task.error = Some(message);
        })
        .await
    }

    /// Valid only from pending/processing. Returns the status the task was in.
    pub async fn cancel(&self, id: Uuid) -> Result<TaskStatus, CancelError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(CancelError::NotFound(id))?;
        if task.status.is_terminal() {
            return Err(CancelError::AlreadyTerminal {
                id,
                status: task.status,
            });
        }
        let previous = task.status;
        task.status = TaskStatus::Cancelled;
        task.touch();
        Ok(previous)
    }

    pub async fn is_cancelled(&self, id: Uuid) -> bool {
        self.tasks
            .read()
            .await
            .get(&id)
            .is_some_and(|t| t.status == TaskStatus::Cancelled)
    }
}
