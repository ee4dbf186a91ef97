//! Error types for the visit simulator.

use std::time::Duration;

use uuid::Uuid;

use crate::tasks::model::TaskStatus;

/// Failures outside a single task or visit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Task lookup and lifecycle errors surfaced to API callers.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound { id: Uuid },

    #[error("{0}")]
    Validation(String),

    #[error("Task is already stopped or completed")]
    AlreadyFinished { id: Uuid, status: TaskStatus },
}

/// A single failed visit. Each one counts toward a task's error threshold.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("Invalid target URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_errors_render_api_messages() {
        let id = Uuid::new_v4();
        assert_eq!(TaskError::NotFound { id }.to_string(), "Task not found");
        assert_eq!(
            TaskError::AlreadyFinished {
                id,
                status: TaskStatus::Completed
            }
            .to_string(),
            "Task is already stopped or completed"
        );
        assert_eq!(
            TaskError::Validation("Invalid URL format".into()).to_string(),
            "Invalid URL format"
        );
    }

    #[test]
    fn visit_errors_name_the_url() {
        let err = VisitError::Status {
            url: "https://example.com/".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "Request to https://example.com/ returned status 503"
        );
    }

    #[test]
    fn internal_error_message() {
        let err = Error::Internal("processing panicked: boom".into());
        assert_eq!(err.to_string(), "Internal error: processing panicked: boom");
    }
}
