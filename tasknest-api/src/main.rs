//! # TaskNest API Server
//!
//! Task management backend with session login, per-user task CRUD and
//! profile images stored on a remote image host.
//!
//! ## Usage
//!
//! ```bash
//! STORE_BACKEND=memory IMAGE_HOST=mock cargo run -p tasknest-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use anyhow::Context;
use std::sync::Arc;
use tasknest_api::{
    app::{build_router, AppState},
    config::{Config, ImageHostKind, StoreBackend},
};
use tasknest_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    images::{CloudinaryHost, ImageHost, MockImageHost},
    store::{MemoryStore, PgStore, ResourceStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tasknest_api=debug,tasknest_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ResourceStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let pool = create_pool(DatabaseConfig {
                url: config.store.database_url.clone(),
                max_connections: config.store.max_connections,
                ..DatabaseConfig::default()
            })
            .await
            .context("failed to connect to database")?;

            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;

            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn open_image_host(config: &Config) -> anyhow::Result<Arc<dyn ImageHost>> {
    match (config.images.host, &config.images.cloudinary) {
        (ImageHostKind::Cloudinary, Some(cloudinary)) => Ok(Arc::new(
            CloudinaryHost::new(cloudinary.clone()).context("invalid Cloudinary configuration")?,
        )),
        (ImageHostKind::Cloudinary, None) => {
            anyhow::bail!("IMAGE_HOST=cloudinary requires Cloudinary credentials")
        }
        (ImageHostKind::Mock, _) => {
            tracing::warn!("Using mock image host; uploads are not persisted");
            Ok(Arc::new(MockImageHost::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "TaskNest API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("failed to load configuration")?;
    let address = config.bind_address();

    let store = open_store(&config).await?;
    let images = open_image_host(&config)?;

    tracing::info!(
        store = store.backend(),
        images = images.name(),
        "Collaborators ready"
    );

    let state = AppState::new(store.clone(), images, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    tracing::info!("Server stopped");

    Ok(())
}
