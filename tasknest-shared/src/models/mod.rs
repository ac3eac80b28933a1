/// Database models for TaskNest
///
/// This module contains all database models and their SQL operations.
/// Handlers never call these directly; they go through
/// [`crate::store::ResourceStore`], whose PostgreSQL backend is built on them.
///
/// # Models
///
/// - `user`: User accounts and credentials
/// - `task`: Owner-scoped to-do items
/// - `profile_image`: One profile picture per user, stored on the image host
///
/// # Example
///
/// ```no_run
/// use tasknest_shared::models::user::{User, CreateUser};
/// use tasknest_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     username: "alice".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     email: None,
///     first_name: "Alice".to_string(),
///     last_name: String::new(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod profile_image;
pub mod task;
pub mod user;
