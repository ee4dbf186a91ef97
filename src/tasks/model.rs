//! Task data model: the task record, its status machine, history entries,
//! and the creation request.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Most recent log entries kept per task.
pub const MAX_LOGS: usize = 100;
/// Most recent error entries kept per task.
pub const MAX_ERRORS: usize = 50;
/// Upper bound on a task's target visit count.
pub const MAX_USER_COUNT: u32 = 10_000;
/// Log entries included in a stats snapshot.
pub const RECENT_LOGS: usize = 10;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up.
    Pending,
    /// Being driven by a processor (or waiting to be resumed by one).
    Running,
    /// Reserved. Nothing transitions into it.
    Paused,
    Completed,
    /// Gave up after too many visit errors.
    Failed,
    /// Stopped by an operator.
    Stopped,
}

impl TaskStatus {
    /// Whether the scheduler should drive a task in this status.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Whether an operator stop request is refused for this status.
    pub fn rejects_stop(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// One line of task activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// A visit-generation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub target_url: String,
    pub user_count: u32,
    pub created_users_count: u32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: Vec<LogEntry>,
    pub errors: Vec<ErrorEntry>,
}

impl Task {
    /// Create a pending task with zeroed progress and empty history.
    pub fn new(target_url: impl Into<String>, user_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            target_url: target_url.into(),
            user_count,
            created_users_count: 0,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            logs: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Append a log line, dropping the oldest past [`MAX_LOGS`].
    pub fn push_log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
        if self.logs.len() > MAX_LOGS {
            let drain_count = self.logs.len() - MAX_LOGS;
            self.logs.drain(..drain_count);
        }
    }

    /// Append an error, dropping the oldest past [`MAX_ERRORS`].
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(ErrorEntry {
            timestamp: Utc::now(),
            error: error.into(),
        });
        if self.errors.len() > MAX_ERRORS {
            let drain_count = self.errors.len() - MAX_ERRORS;
            self.errors.drain(..drain_count);
        }
    }

    /// Whether every requested visit has been generated.
    pub fn is_done(&self) -> bool {
        self.created_users_count >= self.user_count
    }

    /// Progress snapshot as of `now`.
    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        let progress = if self.user_count == 0 {
            0
        } else {
            let ratio = f64::from(self.created_users_count) / f64::from(self.user_count);
            ((ratio * 100.0).round() as u32).min(100)
        };

        let duration = self
            .started_at
            .map(|start| {
                let end = self.completed_at.unwrap_or(now);
                let millis = end.signed_duration_since(start).num_milliseconds().max(0);
                (millis as f64 / 1000.0).round() as u64
            })
            .unwrap_or(0);

        let recent_from = self.logs.len().saturating_sub(RECENT_LOGS);

        TaskStats {
            id: self.id,
            target_url: self.target_url.clone(),
            total_users: self.user_count,
            created_users: self.created_users_count,
            progress,
            status: self.status,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration,
            recent_logs: self.logs[recent_from..].to_vec(),
            error_count: self.errors.len(),
        }
    }
}

/// Progress snapshot served by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub id: Uuid,
    pub target_url: String,
    pub total_users: u32,
    pub created_users: u32,
    /// Percentage in `[0, 100]`.
    pub progress: u32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whole seconds since start; 0 if never started.
    pub duration: u64,
    pub recent_logs: Vec<LogEntry>,
    pub error_count: usize,
}

/// Body of a task creation request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub target_url: Option<String>,
    /// Accepts a JSON integer or a numeric string.
    #[serde(default)]
    pub user_count: Option<serde_json::Value>,
}

impl CreateTaskRequest {
    /// Validate the request and build the pending task it describes.
    pub fn into_task(self) -> Result<Task, TaskError> {
        let target_url = self
            .target_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let user_count = self.user_count.filter(|v| !v.is_null());

        let (Some(target_url), Some(user_count)) = (target_url, user_count) else {
            return Err(TaskError::Validation(
                "targetUrl and userCount are required".into(),
            ));
        };

        let user_count = parse_user_count(&user_count)?;
        if !(1..=i64::from(MAX_USER_COUNT)).contains(&user_count) {
            return Err(TaskError::Validation(format!(
                "userCount must be between 1 and {MAX_USER_COUNT}"
            )));
        }

        if Url::parse(&target_url).is_err() {
            return Err(TaskError::Validation("Invalid URL format".into()));
        }

        Ok(Task::new(target_url, user_count as u32))
    }
}

fn parse_user_count(value: &serde_json::Value) -> Result<i64, TaskError> {
    let invalid = || TaskError::Validation("userCount must be an integer".into());
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(f as i64),
                    _ => Err(invalid()),
                }
            }
        }
        serde_json::Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
