/// In-memory resource store
///
/// Keeps users, tasks and profile images in hash maps behind a single tokio
/// `RwLock`. Every read-check-write happens under one write guard. Used for
/// local development (`STORE_BACKEND=memory`) and by the test suites.
///
/// Timestamps come from a monotonic clock so that `created_at` ordering and
/// `updated_at` refreshes stay strict even within one clock tick.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ReplacedImage, ResourceStore, StoreError, StoreResult, DUPLICATE_PROFILE_IMAGE,
    DUPLICATE_USERNAME, PROFILE_IMAGE_CHANGED,
};
use crate::auth::authorization::{require_ownership, Action};
use crate::auth::middleware::AuthContext;
use crate::images::StoredImage;
use crate::models::profile_image::{CreateProfileImage, ProfileImage};
use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
    profile_images: HashMap<Uuid, ProfileImage>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn task_mut(&mut self, id: Uuid) -> StoreResult<&mut Task> {
        self.tasks.get_mut(&id).ok_or(StoreError::NotFound("Task"))
    }

    fn profile_image_mut(&mut self, id: Uuid) -> StoreResult<&mut ProfileImage> {
        self.profile_images
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Profile image"))
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a profile image row as-is (e.g. one without a stored public id)
    pub async fn insert_profile_image(&self, record: ProfileImage) {
        self.state
            .write()
            .await
            .profile_images
            .insert(record.id, record);
    }

    /// Number of stored tasks across all users
    pub async fn task_count(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    /// Number of stored profile images across all users
    pub async fn profile_image_count(&self) -> usize {
        self.state.read().await.profile_images.len()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.username == data.username) {
            return Err(StoreError::Conflict(DUPLICATE_USERNAME.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            password_hash: data.password_hash,
            email: data.email,
            first_name: data.first_name,
            last_name: data.last_name,
            date_joined: state.now(),
            last_login: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let now = state.now();
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound("User"))?;
        user.last_login = Some(now);
        Ok(())
    }

    async fn list_tasks(&self, auth: &AuthContext, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;

        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.user_id == auth.user_id && filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let page = tasks.into_iter().skip(filter.offset as usize);
        Ok(match filter.limit {
            Some(limit) => page.take(limit as usize).collect(),
            None => page.collect(),
        })
    }

    async fn create_task(&self, auth: &AuthContext, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        let now = state.now();

        let task = Task {
            id: Uuid::new_v4(),
            user_id: auth.user_id,
            title: data.title,
            description: data.description,
            completed: data.completed,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, auth: &AuthContext, id: Uuid) -> StoreResult<Task> {
        self.state
            .read()
            .await
            .tasks
            .get(&id)
            .filter(|t| t.user_id == auth.user_id)
            .cloned()
            .ok_or(StoreError::NotFound("Task"))
    }

    async fn update_task(
        &self,
        auth: &AuthContext,
        id: Uuid,
        data: UpdateTask,
    ) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        let now = state.now();

        let task = state.task_mut(id)?;
        require_ownership(auth, task.user_id, Action::UpdateTask)?;

        data.apply_to(task, now);
        Ok(task.clone())
    }

    async fn delete_task(&self, auth: &AuthContext, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;

        let task = state.task_mut(id)?;
        require_ownership(auth, task.user_id, Action::DeleteTask)?;

        state.tasks.remove(&id);
        Ok(())
    }

    async fn create_profile_image(
        &self,
        auth: &AuthContext,
        data: CreateProfileImage,
    ) -> StoreResult<ProfileImage> {
        require_ownership(auth, data.student_id, Action::ModifyProfileImage)?;

        let mut state = self.state.write().await;

        if state
            .profile_images
            .values()
            .any(|p| p.student_id == data.student_id)
        {
            return Err(StoreError::Conflict(DUPLICATE_PROFILE_IMAGE.to_string()));
        }

        let now = state.now();
        let record = ProfileImage {
            id: Uuid::new_v4(),
            student_id: data.student_id,
            image_url: Some(data.image.secure_url),
            public_id: Some(data.image.public_id),
            created_at: now,
            updated_at: now,
        };
        state.profile_images.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_profile_image_by_student(
        &self,
        student_id: Uuid,
    ) -> StoreResult<Option<ProfileImage>> {
        Ok(self
            .state
            .read()
            .await
            .profile_images
            .values()
            .find(|p| p.student_id == student_id)
            .cloned())
    }

    async fn get_profile_image(&self, id: Uuid) -> StoreResult<ProfileImage> {
        self.state
            .read()
            .await
            .profile_images
            .get(&id)
            .cloned()
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
        let mut state = self.state.write().await;
        let now = state.now();

        let record = state.profile_image_mut(id)?;
        require_ownership(auth, record.student_id, Action::ModifyProfileImage)?;

        let previous_object = record.remote_object_id();
        record.image_url = Some(image.secure_url);
        record.public_id = Some(image.public_id);
        record.updated_at = now;

        Ok(ReplacedImage {
            record: record.clone(),
            previous_object,
        })
    }

    async fn delete_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
        expected_object: Option<&str>,
    ) -> StoreResult<ProfileImage> {
        let mut state = self.state.write().await;

        let record = state.profile_image_mut(id)?;
        require_ownership(auth, record.student_id, Action::ModifyProfileImage)?;
        if record.remote_object_id().as_deref() != expected_object {
            return Err(StoreError::Conflict(PROFILE_IMAGE_CHANGED.to_string()));
        }

        state
            .profile_images
            .remove(&id)
            .ok_or(StoreError::NotFound("Profile image"))
    }
}
