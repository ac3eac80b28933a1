/// Owner-aware resource store
///
/// Handlers never touch tables directly. Everything goes through
/// [`ResourceStore`], whose methods take the caller's [`AuthContext`] wherever
/// ownership matters:
///
/// - reads of tasks are scoped to the caller (someone else's task is `NotFound`);
/// - updates and deletes load the row, run the ownership guard and write in a
///   single atomic unit (`Forbidden` leaves the row untouched);
/// - profile images are readable by anyone authenticated but only their owner
///   may create, replace or delete them.
///
/// Two backends implement the trait:
///
/// - [`postgres::PgStore`]: sqlx/PostgreSQL, row locks inside transactions
/// - [`memory::MemoryStore`]: process-local maps behind one `RwLock`
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tasknest_shared::auth::middleware::AuthContext;
/// use tasknest_shared::models::task::CreateTask;
/// use tasknest_shared::store::{memory::MemoryStore, ResourceStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn ResourceStore> = Arc::new(MemoryStore::new());
/// # let user = store.create_user(tasknest_shared::models::user::CreateUser {
/// #     username: "alice".into(), password_hash: "x".into(), email: None,
/// #     first_name: String::new(), last_name: String::new() }).await?;
/// let auth = AuthContext::new(user.id, "alice");
///
/// let task = store.create_task(&auth, CreateTask::titled("buy milk")).await?;
/// assert_eq!(task.user_id, auth.user_id);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::authorization::AuthzError;
use crate::auth::middleware::AuthContext;
use crate::images::StoredImage;
use crate::models::profile_image::{CreateProfileImage, ProfileImage};
use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Message for a duplicate username
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Message for a second profile image on the same user
pub const DUPLICATE_PROFILE_IMAGE: &str = "This user already has a profile image.";

/// Message for a delete that raced with a replace
pub const PROFILE_IMAGE_CHANGED: &str = "The profile image changed while it was being deleted.";

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record does not exist (or is not visible to the caller)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The ownership guard refused the operation
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// A uniqueness rule would be violated
    #[error("{0}")]
    Conflict(String),

    /// Backend failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// A profile image after its object was swapped
#[derive(Debug, Clone)]
pub struct ReplacedImage {
    /// The updated record
    pub record: ProfileImage,

    /// Remote identifier of the object that is no longer referenced
    pub previous_object: Option<String>,
}

/// Persistent storage for users, tasks and profile images
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Backend name for logging and health reports (e.g., "postgres", "memory")
    fn backend(&self) -> &'static str;

    /// Checks that the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Releases backend resources on shutdown
    async fn close(&self) {}

    // ---- users ----

    /// Creates a user; `Conflict` if the username is taken
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Stamps `last_login`
    async fn record_login(&self, id: Uuid) -> StoreResult<()>;

    // ---- tasks ----

    /// The caller's tasks, newest first
    async fn list_tasks(&self, auth: &AuthContext, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Creates a task owned by the caller
    async fn create_task(&self, auth: &AuthContext, data: CreateTask) -> StoreResult<Task>;

    /// One of the caller's tasks; other owners' tasks are `NotFound`
    async fn get_task(&self, auth: &AuthContext, id: Uuid) -> StoreResult<Task>;

    /// Load, guard and update atomically
    async fn update_task(&self, auth: &AuthContext, id: Uuid, data: UpdateTask)
        -> StoreResult<Task>;

    /// Load, guard and delete atomically
    async fn delete_task(&self, auth: &AuthContext, id: Uuid) -> StoreResult<()>;

    // ---- profile images ----

    /// Creates the caller's profile image record
    ///
    /// `Forbidden` unless `data.student_id` is the caller, `Conflict` if the
    /// student already has one.
    async fn create_profile_image(
        &self,
        auth: &AuthContext,
        data: CreateProfileImage,
    ) -> StoreResult<ProfileImage>;

    async fn find_profile_image_by_student(
        &self,
        student_id: Uuid,
    ) -> StoreResult<Option<ProfileImage>>;

    /// Any profile image by ID
    async fn get_profile_image(&self, id: Uuid) -> StoreResult<ProfileImage>;

    /// Loads a profile image and checks the caller owns it
    async fn authorize_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
    ) -> StoreResult<ProfileImage>;

    /// Points the record at a new object and returns the one it replaced
    async fn replace_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
        image: StoredImage,
    ) -> StoreResult<ReplacedImage>;

    /// Load, guard and delete atomically; returns the removed record
    ///
    /// `expected_object` is the remote object the caller already destroyed.
    /// If the record now points elsewhere the row is kept and `Conflict` is
    /// returned.
    async fn delete_profile_image(
        &self,
        auth: &AuthContext,
        id: Uuid,
        expected_object: Option<&str>,
    ) -> StoreResult<ProfileImage>;
}
