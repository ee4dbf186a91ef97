//! REST endpoints for tasks.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::CreateTaskRequest;
use super::store::TaskStore;
use crate::engine::TaskScheduler;
use crate::error::TaskError;

/// Shared state for task handlers.
#[derive(Clone)]
pub struct TaskApiState {
    pub store: Arc<TaskStore>,
    /// Woken after a task is created so it starts without waiting for a poll.
    pub scheduler: Option<Arc<TaskScheduler>>,
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = match self {
            TaskError::NotFound { .. } => StatusCode::NOT_FOUND,
            TaskError::Validation(_) | TaskError::AlreadyFinished { .. } => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(json!({"success": false, "error": self.to_string()})),
        )
            .into_response()
    }
}

/// Unparseable ids can't name a stored task, so they read as not found.
fn parse_id(id: &str) -> Result<Uuid, TaskError> {
    Uuid::parse_str(id).map_err(|_| TaskError::NotFound { id: Uuid::nil() })
}

/// Build the task routes (`/tasks`, `/tasks/{id}`, ...).
pub fn task_routes(state: TaskApiState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", get(get_task).delete(delete_task))
        .route("/tasks/{id}/stop", post(stop_task))
        .route("/tasks/{id}/stats", get(task_stats))
        .with_state(state)
}

/// Full HTTP surface: health check plus the task API under `/api`, with
/// permissive CORS for a separately hosted frontend.
pub fn app_router(state: TaskApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", task_routes(state))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "visit-sim"
    }))
}

async fn list_tasks(State(state): State<TaskApiState>) -> impl IntoResponse {
    let tasks = state.store.list().await;
    Json(json!({"success": true, "tasks": tasks}))
}

async fn get_task(
    State(state): State<TaskApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let id = parse_id(&id)?;
    let task = state.store.get(id).await.ok_or(TaskError::NotFound { id })?;
    Ok(Json(json!({"success": true, "task": task})))
}

async fn create_task(
    State(state): State<TaskApiState>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TaskError> {
    let Json(request) = body.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected task body");
        TaskError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let task = state.store.add(request.into_task()?).await;
    if let Some(scheduler) = &state.scheduler {
        scheduler.wake();
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "task": task})),
    ))
}

async fn stop_task(
    State(state): State<TaskApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let id = parse_id(&id)?;
    let task = state.store.request_stop(id).await?;
    Ok(Json(json!({"success": true, "task": task})))
}

async fn delete_task(
    State(state): State<TaskApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let id = parse_id(&id)?;
    if !state.store.delete(id).await {
        return Err(TaskError::NotFound { id });
    }
    info!(task_id = %id, "Task deleted via API");
    Ok(Json(json!({"success": true, "message": "Task deleted successfully"})))
}

async fn task_stats(
    State(state): State<TaskApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let id = parse_id(&id)?;
    let task = state.store.get(id).await.ok_or(TaskError::NotFound { id })?;
    Ok(Json(json!({"success": true, "stats": task.stats(Utc::now())})))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::tasks::model::{Task, TaskStatus};

    fn app(store: &Arc<TaskStore>) -> Router {
        task_routes(TaskApiState {
            store: Arc::clone(store),
            scheduler: None,
        })
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn create_returns_pending_task() {
        let store = TaskStore::new();
        let (status, json) = send(
            app(&store),
            "POST",
            "/tasks",
            Some(json!({"targetUrl": "https://example.com", "userCount": 3})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        assert_eq!(json["task"]["status"], "pending");
        assert_eq!(json["task"]["createdUsersCount"], 0);
        assert_eq!(json["task"]["userCount"], 3);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn create_validation_errors() {
        let store = TaskStore::new();
        let cases = [
            (json!({"userCount": 3}), "targetUrl and userCount are required"),
            (
                json!({"targetUrl": "https://example.com", "userCount": 0}),
                "userCount must be between 1 and 10000",
            ),
            (
                json!({"targetUrl": "notaurl", "userCount": 3}),
                "Invalid URL format",
            ),
        ];
        for (body, message) in cases {
            let (status, json) = send(app(&store), "POST", "/tasks", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], message);
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn create_without_json_body_is_bad_request() {
        let store = TaskStore::new();
        let (status, json) = send(app(&store), "POST", "/tasks", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn get_and_list() {
        let store = TaskStore::new();
        let task = store.add(Task::new("https://example.com", 4)).await;

        let (status, json) = send(app(&store), "GET", &format!("/tasks/{}", task.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["task"]["id"], task.id.to_string());

        let (status, json) = send(app(&store), "GET", "/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tasks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_or_malformed_id_is_not_found() {
        let store = TaskStore::new();
        for uri in [
            format!("/tasks/{}", Uuid::new_v4()),
            "/tasks/not-a-uuid".to_string(),
            format!("/tasks/{}/stats", Uuid::new_v4()),
        ] {
            let (status, json) = send(app(&store), "GET", &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(json["error"], "Task not found");
        }
        let (status, _) = send(app(&store), "DELETE", &format!("/tasks/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            send(app(&store), "POST", &format!("/tasks/{}/stop", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stop_then_stop_again() {
        let store = TaskStore::new();
        let task = store.add(Task::new("https://example.com", 4)).await;
        let uri = format!("/tasks/{}/stop", task.id);

        let (status, json) = send(app(&store), "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["task"]["status"], "stopped");
        assert!(json["task"]["completedAt"].is_string());

        let (status, json) = send(app(&store), "POST", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Task is already stopped or completed");
    }

    #[tokio::test]
    async fn delete_removes_task() {
        let store = TaskStore::new();
        let task = store.add(Task::new("https://example.com", 4)).await;

        let (status, json) = send(app(&store), "DELETE", &format!("/tasks/{}", task.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(store.get(task.id).await.is_none());
    }

    #[tokio::test]
    async fn stats_snapshot() {
        let store = TaskStore::new();
        let mut task = Task::new("https://example.com", 3);
        task.status = TaskStatus::Running;
        task.created_users_count = 1;
        task.push_log("Task started - Creating 3 fake users");
        task.push_error("timeout");
        let task = store.add(task).await;

        let (status, json) =
            send(app(&store), "GET", &format!("/tasks/{}/stats", task.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let stats = &json["stats"];
        assert_eq!(stats["progress"], 33);
        assert_eq!(stats["totalUsers"], 3);
        assert_eq!(stats["createdUsers"], 1);
        assert_eq!(stats["duration"], 0);
        assert_eq!(stats["status"], "running");
        assert_eq!(stats["errorCount"], 1);
        assert_eq!(stats["recentLogs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn app_router_serves_health_and_api_prefix() {
        let store = TaskStore::new();
        let router = app_router(TaskApiState {
            store: Arc::clone(&store),
            scheduler: None,
        });

        let (status, json) = send(router.clone(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let (status, json) = send(router, "GET", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }
}
