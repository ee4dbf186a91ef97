//! Task scheduler: discovers eligible tasks and launches one processing
//! routine per task.
//!
//! Runs on a fixed poll interval. [`TaskScheduler::wake`] triggers an early
//! scan (e.g. right after a task is created); the poll stays authoritative.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::processor::{ProcessOutcome, TaskProcessor};
use super::registry::{ActiveRegistry, Claim};
use crate::tasks::store::TaskStore;

/// Polls the store and drives every pending/running task that has no
/// processing routine yet.
pub struct TaskScheduler {
    store: Arc<TaskStore>,
    processor: Arc<TaskProcessor>,
    registry: Arc<ActiveRegistry>,
    poll_interval: Duration,
    wake: Notify,
}

impl TaskScheduler {
    pub fn new(
        store: Arc<TaskStore>,
        processor: Arc<TaskProcessor>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            processor,
            registry: ActiveRegistry::new(),
            poll_interval,
            wake: Notify::new(),
        })
    }

    /// Request a scan without waiting for the next poll.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub fn registry(&self) -> &Arc<ActiveRegistry> {
        &self.registry
    }

    /// One scan: claim and launch every eligible task. Returns the handles of
    /// the routines started.
    pub async fn tick(&self) -> Vec<(Uuid, JoinHandle<ProcessOutcome>)> {
        let mut launched = Vec::new();

        for task in self.store.list().await {
            if !task.status.is_schedulable() {
                continue;
            }
            // Claimed synchronously, before the routine is spawned.
            let Some(claim) = self.registry.try_claim(task.id) else {
                continue;
            };

            info!(task_id = %task.id, status = %task.status, "Launching task processor");
            launched.push((task.id, self.launch(claim)));
        }

        debug!(
            launched = launched.len(),
            active = self.registry.len(),
            "Scheduler tick"
        );
        launched
    }

    fn launch(&self, claim: Claim) -> JoinHandle<ProcessOutcome> {
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            let id = claim.id();
            let outcome = processor.run(id).await;
            debug!(task_id = %id, outcome = ?outcome, "Task processor exited");
            drop(claim);
            outcome
        })
    }

    /// Spawn the polling loop. The first scan runs immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Task scheduler started (interval: {}ms)",
                self.poll_interval.as_millis()
            );
            let mut tick = tokio::time::interval(self.poll_interval);

            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = self.wake.notified() => {}
                }
                self.tick().await;
            }
        })
    }
}
