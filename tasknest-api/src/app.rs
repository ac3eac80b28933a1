/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasknest_api::{app::{build_router, AppState}, config::Config};
/// use tasknest_shared::{images::MockImageHost, store::MemoryStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let state = AppState::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MockImageHost::new()),
///     Config::local(),
/// );
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tasknest_shared::{auth::middleware::require_session, images::ImageHost, store::ResourceStore};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{
    cookie::{time::Duration, SameSite},
    Expiry, MemoryStore as SessionMemoryStore, SessionManagerLayer,
};
use tracing::Level;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "tasknest_session";

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Users, tasks and profile images
    pub store: Arc<dyn ResourceStore>,

    /// Remote image service
    pub images: Arc<dyn ImageHost>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn ResourceStore>, images: Arc<dyn ImageHost>, config: Config) -> Self {
        Self {
            store,
            images,
            config: Arc::new(config),
        }
    }

    /// Folder profile images are uploaded to
    pub fn image_folder(&self) -> &str {
        &self.config.images.folder
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /
/// ├── GET    /health              (public)
/// ├── POST   /register            (public)
/// ├── POST   /login               (public)
/// ├── POST   /logout
/// ├── GET    /me
/// ├── GET    /tasks               ?limit=&offset=&completed=
/// ├── POST   /tasks
/// ├── GET    /tasks/:id
/// ├── PUT    /tasks/:id
/// ├── PATCH  /tasks/:id
/// ├── DELETE /tasks/:id
/// ├── POST   /profile             (multipart: student, image)
/// ├── GET    /profile/:id
/// ├── PUT    /profile/:id         (multipart: image?)
/// ├── PATCH  /profile/:id         (multipart: image?)
/// └── DELETE /profile/:id
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Sessions (tower-sessions, cookie `tasknest_session`)
/// 2. Security headers
/// 3. CORS
/// 4. Logging (tower-http TraceLayer)
/// 5. Body limit
/// 6. `require_session` on every route except health, register and login
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let protected_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::replace_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/profile", post(routes::profile::create_profile_image))
        .route(
            "/profile/:id",
            get(routes::profile::get_profile_image)
                .put(routes::profile::replace_profile_image)
                .patch(routes::profile::replace_profile_image)
                .delete(routes::profile::delete_profile_image),
        )
        .route_layer(from_fn(require_session));

    let config = state.config.clone();

    let cors = if config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let sessions = SessionManagerLayer::new(SessionMemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(config.session.secure_cookie)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            config.session.inactivity_minutes,
        )));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.api.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(config.api.production))
        .layer(sessions)
        .with_state(state)
}
