/// Authentication endpoints
///
/// Session based: a successful login sets the `tasknest_session` cookie, which
/// the client sends back on every protected request.
///
/// # Endpoints
///
/// - `POST /register` - Register new user (public)
/// - `POST /login` - Start a session (public)
/// - `POST /logout` - End the session
/// - `GET /me` - The logged-in user

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Deserializer, Serialize};
use tasknest_shared::{
    auth::{
        identity::{self, NewAccount},
        middleware::AuthContext,
    },
    models::user::UserSummary,
    store::StoreError,
};
use tower_sessions::Session;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Unique username
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    /// Plaintext password
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Optional; blank is treated as absent
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: UserSummary,
    pub message: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Plain `{"message": ...}` body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Register a new user
///
/// ```text
/// POST /register
/// {"username": "alice", "password": "pw1", "email": "alice@example.com"}
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let user = identity::register(
        state.store.as_ref(),
        NewAccount {
            username: req.username,
            password: req.password,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserSummary::from(&user),
            message: "User registered successfully.".to_string(),
        }),
    ))
}

/// Log in and start a session
///
/// ```text
/// POST /login
/// {"username": "alice", "password": "pw1"}
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = identity::authenticate(state.store.as_ref(), &req.username, &req.password).await?;
    identity::login(state.store.as_ref(), &session, &user).await?;

    Ok(MessageResponse::new("Login successful."))
}

/// End the session
pub async fn logout(
    session: Session,
    Extension(_auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    identity::logout(&session).await?;
    Ok(MessageResponse::new("Logout successful."))
}

/// The logged-in user
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserSummary>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or(StoreError::NotFound("User"))?;

    Ok(Json(UserSummary::from(&user)))
}
