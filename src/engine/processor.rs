//! Task processor: drives one task from pending to a terminal status.
//!
//! The processor re-reads the task from the store before every visit rather
//! than caching decisions, so an operator stop or delete is noticed after
//! the visit in flight finishes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::random::RandomSource;
use crate::tasks::model::TaskStatus;
use crate::tasks::store::TaskStore;
use crate::visit::Visitor;

/// How a processing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed,
    /// Stopped by an operator before or during the run.
    Stopped,
    /// Too many visit errors.
    Failed,
    /// Deleted while being processed.
    Removed,
    /// Not pending or running when the run began.
    Skipped,
    /// Panicked; recorded on the task.
    Aborted,
}

/// Drives tasks through the visit loop.
pub struct TaskProcessor {
    store: Arc<TaskStore>,
    visitor: Arc<dyn Visitor>,
    rng: Arc<dyn RandomSource>,
    visit_delay_ms: (u64, u64),
    retry_delay: Duration,
    max_errors: usize,
}

impl TaskProcessor {
    pub fn new(
        store: Arc<TaskStore>,
        visitor: Arc<dyn Visitor>,
        rng: Arc<dyn RandomSource>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            visitor,
            rng,
            visit_delay_ms: config.visit_delay_ms,
            retry_delay: config.retry_delay,
            max_errors: config.max_errors,
        }
    }

    /// Process a task, containing any panic: it is appended to the task's
    /// error list instead of unwinding into the scheduler.
    pub async fn run(&self, id: Uuid) -> ProcessOutcome {
        match AssertUnwindSafe(self.process(id)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(task_id = %id, reason = %reason, "Task processing panicked");
                let err = Error::Internal(format!("processing panicked: {reason}"));
                self.store.append_error(id, err.to_string()).await;
                ProcessOutcome::Aborted
            }
        }
    }

    /// The state machine proper.
    pub async fn process(&self, id: Uuid) -> ProcessOutcome {
        let Some(started) = self
            .store
            .update_with(id, |task| {
                if !task.status.is_schedulable() {
                    return None;
                }
                task.status = TaskStatus::Running;
                task.started_at.get_or_insert_with(Utc::now);
                Some(task.user_count)
            })
            .await
        else {
            return ProcessOutcome::Removed;
        };
        let Some(user_count) = started else {
            debug!(task_id = %id, "Task no longer schedulable, skipping");
            return ProcessOutcome::Skipped;
        };

        self.store
            .append_log(id, format!("Task started - Creating {user_count} fake users"))
            .await;
        info!(task_id = %id, users = user_count, "Task started");

        loop {
            let task = match self.store.get(id).await {
                Some(task) if task.status != TaskStatus::Stopped => task,
                _ => {
                    self.store.append_log(id, "Task stopped by user").await;
                    info!(task_id = %id, "Task stopped by user");
                    break;
                }
            };
            if task.is_done() {
                break;
            }

            match self.visitor.visit(&task.target_url).await {
                Ok(report) => {
                    let Some(created) = self.store.increment_created(id).await else {
                        continue;
                    };
                    self.store
                        .append_log(
                            id,
                            format!(
                                "User {created}/{} created - Visited {} pages in {}ms",
                                task.user_count,
                                report.pages_visited,
                                report.duration.as_millis()
                            ),
                        )
                        .await;
                    debug!(
                        task_id = %id,
                        created,
                        target = task.user_count,
                        pages = report.pages_visited,
                        "Visit generated"
                    );

                    if created < task.user_count {
                        self.pause(self.visit_delay_ms).await;
                    }
                }
                Err(e) => {
                    warn!(task_id = %id, error = %e, "Visit failed");
                    let retained = self.store.append_error(id, e.to_string()).await.unwrap_or(0);

                    if retained > self.max_errors {
                        let failed = self
                            .store
                            .update_with(id, |task| {
                                if task.status == TaskStatus::Stopped {
                                    return false;
                                }
                                task.status = TaskStatus::Failed;
                                true
                            })
                            .await
                            .unwrap_or(false);
                        // A stop that landed during the visit keeps the task stopped.
                        if failed {
                            self.store
                                .append_log(id, "Task failed due to too many errors")
                                .await;
                            info!(task_id = %id, errors = retained, "Task failed due to too many errors");
                        }
                        break;
                    }

                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        self.finish(id).await
    }

    /// Mark the task completed unless it was stopped or failed meanwhile.
    async fn finish(&self, id: Uuid) -> ProcessOutcome {
        let outcome = self
            .store
            .update_with(id, |task| match task.status {
                TaskStatus::Stopped => (ProcessOutcome::Stopped, task.created_users_count),
                TaskStatus::Failed => (ProcessOutcome::Failed, task.created_users_count),
                _ => {
                    task.status = TaskStatus::Completed;
                    task.completed_at = Some(Utc::now());
                    (ProcessOutcome::Completed, task.created_users_count)
                }
            })
            .await;

        let Some((outcome, created)) = outcome else {
            info!(task_id = %id, "Task removed during processing");
            return ProcessOutcome::Removed;
        };

        if outcome == ProcessOutcome::Completed {
            self.store
                .append_log(id, format!("Task completed - {created} users created"))
                .await;
            info!(task_id = %id, created, "Task completed");
        }

        outcome
    }

    async fn pause(&self, (min, max): (u64, u64)) {
        let millis = self.rng.between(min, max);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
