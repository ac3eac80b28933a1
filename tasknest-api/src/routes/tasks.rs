/// Task endpoints
///
/// Every handler receives the caller as an explicit [`AuthContext`]; the store
/// applies owner scoping and the ownership guard.
///
/// # Endpoints
///
/// - `GET /tasks` - List own tasks, newest first (`?limit=&offset=&completed=`)
/// - `POST /tasks` - Create a task owned by the caller
/// - `GET /tasks/:id` - Own task by ID (others' tasks are 404)
/// - `PUT /tasks/:id` - Full update, `title` required
/// - `PATCH /tasks/:id` - Partial update
/// - `DELETE /tasks/:id` - Delete
///
/// Any `user`/`user_id` field in a request body is ignored; the owner is
/// always the caller.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tasknest_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, Task, TaskFilter, UpdateTask},
};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Title may not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub completed: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub completed: bool,
}

/// Full update request (PUT)
///
/// Omitted optional fields keep their current value.
#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceTaskRequest {
    #[serde(default)]
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,

    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Partial update request (PATCH)
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,

    pub description: Option<String>,
    pub completed: Option<bool>,
}

fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{} not found.", what)))
}

/// List the caller's tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = TaskFilter::new(query.completed, query.limit, query.offset);
    let tasks = state.store.list_tasks(&auth, &filter).await?;
    Ok(Json(tasks))
}

/// Create a task owned by the caller
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing or blank title, title over 200 characters
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .store
        .create_task(
            &auth,
            CreateTask {
                title: req.title,
                description: req.description,
                completed: req.completed,
            },
        )
        .await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// Get one of the caller's tasks
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id, "Task")?;
    Ok(Json(state.store.get_task(&auth, id).await?))
}

/// Full update
///
/// # Errors
///
/// - `403 Forbidden`: The task belongs to someone else
/// - `404 Not Found`: No such task
/// - `422 Unprocessable Entity`: Missing or invalid title
pub async fn replace_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<ReplaceTaskRequest>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id, "Task")?;
    req.validate()?;

    let task = state
        .store
        .update_task(
            &auth,
            id,
            UpdateTask {
                title: Some(req.title),
                description: req.description,
                completed: req.completed,
            },
        )
        .await?;

    Ok(Json(task))
}

/// Partial update
///
/// An empty body still refreshes `updated_at`.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id, "Task")?;
    req.validate()?;

    let task = state
        .store
        .update_task(
            &auth,
            id,
            UpdateTask {
                title: req.title,
                description: req.description,
                completed: req.completed,
            },
        )
        .await?;

    Ok(Json(task))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "Task")?;
    state.store.delete_task(&auth, id).await?;

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest =
            serde_json::from_str(r#"{"title": "Buy milk", "user": "someone-else"}"#).unwrap();
        assert_eq!(req.title, "Buy milk");
        assert_eq!(req.description, "");
        assert!(!req.completed);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_title_rules() {
        let missing: CreateTaskRequest = serde_json::from_str("{}").unwrap();
        assert!(missing.validate().is_err());

        let blank: CreateTaskRequest = serde_json::from_str(r#"{"title": "   "}"#).unwrap();
        assert!(blank.validate().is_err());

        let long = CreateTaskRequest {
            title: "x".repeat(201),
            description: String::new(),
            completed: false,
        };
        assert!(long.validate().is_err());

        let patch: UpdateTaskRequest = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert!(patch.validate().is_ok());

        let patch: UpdateTaskRequest = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id(&Uuid::new_v4().to_string(), "Task").is_ok());
        assert!(matches!(parse_id("42", "Task"), Err(ApiError::NotFound(_))));
    }
}
