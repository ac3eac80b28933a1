/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Register, login, logout and the current user
/// - `tasks`: Owner-scoped task CRUD
/// - `profile`: Profile image upload, retrieval, replacement and deletion

pub mod auth;
pub mod health;
pub mod profile;
pub mod tasks;
