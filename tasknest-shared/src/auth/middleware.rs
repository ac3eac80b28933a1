/// Session authentication middleware for Axum
///
/// Login stores a [`SessionIdentity`] in the server-side session under
/// [`SESSION_IDENTITY_KEY`]. On protected routes, [`require_session`] reads it
/// back and inserts an [`AuthContext`] into the request extensions, so handlers
/// receive the caller's identity as an explicit value instead of consulting the
/// session themselves.
///
/// Requests without a logged-in session are rejected with `401 Unauthorized`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use tasknest_shared::auth::middleware::{require_session, AuthContext};
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     auth.username
/// }
///
/// let protected: Router = Router::new()
///     .route("/me", get(whoami))
///     .route_layer(middleware::from_fn(require_session));
/// ```

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::user::User;

/// Session key holding the logged-in identity
pub const SESSION_IDENTITY_KEY: &str = "tasknest.identity";

/// What the session remembers about the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<&User> for SessionIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Authenticated caller, added to request extensions
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use tasknest_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("{} ({})", auth.username, auth.user_id)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Username at login time
    pub username: String,
}

impl AuthContext {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

impl From<SessionIdentity> for AuthContext {
    fn from(identity: SessionIdentity) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// No logged-in identity in the session
    NotAuthenticated,

    /// The session store failed
    SessionError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AuthError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication credentials were not provided.".to_string(),
            ),
            AuthError::SessionError(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": error, "message": message })),
        )
            .into_response()
    }
}

/// Resolves the session into an [`AuthContext`] or rejects the request
///
/// Must run inside a `tower_sessions::SessionManagerLayer`.
///
/// # Errors
///
/// - `AuthError::NotAuthenticated` (401) if nobody is logged in
/// - `AuthError::SessionError` (500) if the session store fails
pub async fn require_session(
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = session
        .get::<SessionIdentity>(SESSION_IDENTITY_KEY)
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?
        .ok_or(AuthError::NotAuthenticated)?;

    req.extensions_mut().insert(AuthContext::from(identity));

    Ok(next.run(req).await)
}
