//! Task store: in-memory keyed task collection with mutation helpers.
//!
//! Helpers that target a task by id are no-ops when the task is gone, since
//! a running processor may race with an operator delete.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Task, TaskStatus};
use crate::error::TaskError;

/// In-memory task store.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl TaskStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert a task, replacing any record with the same id.
    pub async fn add(&self, task: Task) -> Task {
        info!(task_id = %task.id, url = %task.target_url, users = task.user_count, "Task added");
        self.tasks.write().await.insert(task.id, task.clone());
        task
    }

    pub async fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// All tasks, newest first.
    pub async fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Replace a stored record, stamping `updated_at`. Returns `None` (and
    /// stores nothing) if the task was deleted in the meantime.
    pub async fn update(&self, mut task: Task) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        let slot = tasks.get_mut(&task.id)?;
        task.updated_at = Utc::now();
        *slot = task.clone();
        Some(task)
    }

    /// Mutate a task in place under the write lock, stamping `updated_at`.
    pub async fn update_with<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id)?;
        let result = f(task);
        task.updated_at = Utc::now();
        Some(result)
    }

    /// Remove a task. Returns whether it existed.
    pub async fn delete(&self, id: Uuid) -> bool {
        let removed = self.tasks.write().await.remove(&id).is_some();
        if removed {
            info!(task_id = %id, "Task deleted");
        }
        removed
    }

    /// Append a log line. Returns whether the task exists.
    pub async fn append_log(&self, id: Uuid, message: impl Into<String>) -> bool {
        self.update_with(id, |task| task.push_log(message)).await.is_some()
    }

    /// Append an error entry. Returns the retained error count afterwards.
    pub async fn append_error(&self, id: Uuid, error: impl Into<String>) -> Option<usize> {
        self.update_with(id, |task| {
            task.push_error(error);
            task.errors.len()
        })
        .await
    }

    /// Count one more generated visit, never past `user_count`.
    /// Returns the new count.
    pub async fn increment_created(&self, id: Uuid) -> Option<u32> {
        self.update_with(id, |task| {
            if task.created_users_count < task.user_count {
                task.created_users_count += 1;
            }
            task.created_users_count
        })
        .await
    }

    /// Operator stop: mark the task `stopped` directly. The processor notices
    /// on its next re-read.
    pub async fn request_stop(&self, id: Uuid) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(TaskError::NotFound { id })?;

        if task.status.rejects_stop() {
            debug!(task_id = %id, status = %task.status, "Stop refused");
            return Err(TaskError::AlreadyFinished {
                id,
                status: task.status,
            });
        }

        let now = Utc::now();
        task.status = TaskStatus::Stopped;
        task.completed_at = Some(now);
        task.updated_at = now;

        info!(task_id = %id, "Task stop requested");
        Ok(task.clone())
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
