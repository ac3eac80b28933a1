/// Task model and database operations
///
/// Tasks are owner-scoped to-do items. The owner (`user_id`) is taken from the
/// acting identity when the task is created and is never changed afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasknest_shared::models::task::{Task, CreateTask, UpdateTask, TaskFilter};
/// use tasknest_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(owner: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, owner, CreateTask::titled("buy milk")).await?;
///
/// Task::update(&pool, task.id, UpdateTask {
///     completed: Some(true),
///     ..Default::default()
/// }).await?;
///
/// let mine = Task::list_by_owner(&pool, owner, &TaskFilter::default()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owner of the task
    pub user_id: Uuid,

    /// Short title (1-200 characters)
    pub title: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Whether the task is done
    pub completed: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last modified
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
///
/// There is deliberately no owner field: the owner always comes from the
/// authenticated identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Task description
    #[serde(default)]
    pub description: String,

    /// Initial completion flag
    #[serde(default)]
    pub completed: bool,
}

impl CreateTask {
    /// Creates input with just a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Input for updating a task
///
/// Only `Some` fields are written. `updated_at` is refreshed on every update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTask {
    /// Applies the changes to an in-memory task and stamps `updated_at`
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.updated_at = now;
    }
}

/// Filter and pagination for task listings
///
/// The default filter returns every task the owner has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks with this completion flag
    pub completed: Option<bool>,

    /// Page size (clamped to 1..=MAX_PAGE_SIZE), None for no limit
    pub limit: Option<i64>,

    /// Rows to skip (clamped to >= 0)
    pub offset: i64,
}

impl TaskFilter {
    /// Builds a filter, clamping out-of-range values
    ///
    /// Only a limit the caller supplied is clamped. Without one the listing
    /// is unbounded.
    pub fn new(completed: Option<bool>, limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            completed,
            limit: limit.map(|l| l.clamp(1, MAX_PAGE_SIZE)),
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// Whether a task passes the completion filter
    pub fn matches(&self, task: &Task) -> bool {
        self.completed.map_or(true, |flag| task.completed == flag)
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, description, completed, created_at, updated_at";

impl Task {
    /// Creates a new task owned by `owner`
    pub async fn create<'e, E>(executor: E, owner: Uuid, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO tasks (user_id, title, description, completed)
             VALUES ($1, $2, $3, $4)
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner)
            .bind(data.title)
            .bind(data.description)
            .bind(data.completed)
            .fetch_one(executor)
            .await
    }

    /// Finds a task by ID and locks the row until the transaction ends
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a task by ID with owner isolation
    ///
    /// This is the preferred lookup for reads so other users' tasks look absent.
    pub async fn find_by_id_and_owner<'e, E>(
        executor: E,
        id: Uuid,
        owner: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(executor)
            .await
    }

    /// Lists an owner's tasks, newest first
    ///
    /// A NULL `LIMIT` is no limit in PostgreSQL, so an unset page size
    /// returns every matching row.
    pub async fn list_by_owner<'e, E>(
        executor: E,
        owner: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {TASK_COLUMNS}
             FROM tasks
             WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR completed = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(owner)
            .bind(filter.completed)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(executor)
            .await
    }

    /// Applies an update and refreshes `updated_at`
    ///
    /// Returns None if the task does not exist.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE tasks
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 completed = COALESCE($4, completed),
                 updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.completed)
            .fetch_optional(executor)
            .await
    }

    /// Deletes a task permanently
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
