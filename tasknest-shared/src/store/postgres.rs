/// PostgreSQL resource store
///
/// Read-check-write operations run in a transaction that locks the target row
/// with `SELECT ... FOR UPDATE`, so the ownership check and the write see the
/// same row. Unique violations on `users.username` and
/// `profile_images.student_id` surface as `StoreError::Conflict`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{
    ReplacedImage, ResourceStore, StoreError, StoreResult, DUPLICATE_PROFILE_IMAGE,
    DUPLICATE_USERNAME, PROFILE_IMAGE_CHANGED,
};
use crate::auth::authorization::{require_ownership, Action};
use crate::auth::middleware::AuthContext;
use crate::db::pool::{close_pool, health_check};
use crate::images::StoredImage;
use crate::models::profile_image::{CreateProfileImage, ProfileImage};
use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};
use crate::models::user::{CreateUser, User};

/// sqlx-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique violation to `Conflict(message)`, everything else to `Database`
fn conflict_on_unique(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ResourceStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        close_pool(self.pool.clone()).await;
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE_USERNAME))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        if !User::update_last_login(&self.pool, id).await? {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn list_tasks(&self, auth: &AuthContext, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, auth.user_id, filter).await?)
    }

    async fn create_task(&self, auth: &AuthContext, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, auth.user_id, data).await?)
    }

    async fn get_task(&self, auth: &AuthContext, id: Uuid) -> StoreResult<Task> {
        Task::find_by_id_and_owner(&self.pool, id, auth.user_id)
            .await?
            .ok_or(StoreError::NotFound("Task"))
    }

    async fn update_task(
        &self,
        auth: &AuthContext,
        id: Uuid,
        data: UpdateTask,
    ) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = Task::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Task"))?;
        require_ownership(auth, task.user_id, Action::UpdateTask)?;

        let updated = Task::update(&mut *tx, id, data)
            .await?
            .ok_or(StoreError::NotFound("Task"))?;

        tx.commit().await?;
        debug!(task_id = %id, "Task updated");
        Ok(updated)
    }

    async fn delete_task(&self, auth: &AuthContext, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let task = Task::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Task"))?;
        require_ownership(auth, task.user_id, Action::DeleteTask)?;

        Task::delete(&mut *tx, id).await?;

        tx.commit().await?;
        debug!(task_id = %id, "Task deleted");
        Ok(())
    }

    async fn create_profile_image(
        &self,
        auth: &AuthContext,
        data: CreateProfileImage,
    ) -> StoreResult<ProfileImage> {
        require_ownership(auth, data.student_id, Action::ModifyProfileImage)?;

        ProfileImage::create(&self.pool, data)
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE_PROFILE_IMAGE))
    }

    async fn find_profile_image_by_student(
        &self,
        student_id: Uuid,
    ) -> StoreResult<Option<ProfileImage>> {
        Ok(ProfileImage::find_by_student(&self.pool, student_id).await?)
    }

    async fn get_profile_image(&self, id: Uuid) -> StoreResult<ProfileImage> {
        ProfileImage::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound("Profile image"))
    }

    async fn authorize_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
    ) -> StoreResult<ProfileImage> {
        let record = self.get_profile_image(id).await?;
        require_ownership(auth, record.student_id, Action::ModifyProfileImage)?;
        Ok(record)
    }

    async fn replace_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
        image: StoredImage,
    ) -> StoreResult<ReplacedImage> {
        let mut tx = self.pool.begin().await?;

        let current = ProfileImage::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Profile image"))?;
        require_ownership(auth, current.student_id, Action::ModifyProfileImage)?;

        let record = ProfileImage::set_image(&mut *tx, id, image)
            .await?
            .ok_or(StoreError::NotFound("Profile image"))?;

        tx.commit().await?;

        Ok(ReplacedImage {
            previous_object: current.remote_object_id(),
            record,
        })
    }

    async fn delete_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
        expected_object: Option<&str>,
    ) -> StoreResult<ProfileImage> {
        let mut tx = self.pool.begin().await?;

        let record = ProfileImage::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(StoreError::NotFound("Profile image"))?;
        require_ownership(auth, record.student_id, Action::ModifyProfileImage)?;
        if record.remote_object_id().as_deref() != expected_object {
            return Err(StoreError::Conflict(PROFILE_IMAGE_CHANGED.to_string()));
        }

        ProfileImage::delete(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(record)
    }
}
