/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present).
///
/// # Environment Variables
///
/// | Variable                      | Default            |
/// |-------------------------------|--------------------|
/// | `API_HOST`                    | `0.0.0.0`          |
/// | `API_PORT`                    | `8080`             |
/// | `API_PRODUCTION`              | `false`            |
/// | `CORS_ORIGINS`                | `*` (comma list)   |
/// | `MAX_UPLOAD_BYTES`            | `10485760`         |
/// | `STORE_BACKEND`               | `postgres` (`postgres`, `memory`) |
/// | `DATABASE_URL`                | required for `postgres` |
/// | `DATABASE_MAX_CONNECTIONS`    | `10`               |
/// | `SESSION_SECURE_COOKIE`       | value of `API_PRODUCTION` |
/// | `SESSION_INACTIVITY_MINUTES`  | `20160` (14 days)  |
/// | `IMAGE_HOST`                  | `cloudinary` (`cloudinary`, `mock`) |
/// | `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` | required for `cloudinary` |
/// | `CLOUDINARY_BASE_URL`         | `https://api.cloudinary.com` |
/// | `CLOUDINARY_SIGNATURE_ALGORITHM` | `sha1` (`sha1`, `sha256`) |
/// | `IMAGE_FOLDER`                | `profile_images`   |
/// | `IMAGE_TIMEOUT_SECONDS`       | `30`               |
///
/// # Example
///
/// ```no_run
/// use tasknest_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tasknest_shared::images::CloudinaryConfig;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub images: ImageConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Enables HSTS and strict CORS
    pub production: bool,

    /// Allowed CORS origins (`*` = any)
    pub cors_origins: Vec<String>,

    /// Request body limit, covers multipart uploads
    pub max_upload_bytes: usize,
}

/// Which resource store to run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND '{}' (expected postgres or memory)", other),
        }
    }
}

/// Resource store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// PostgreSQL connection URL (empty for the memory backend)
    #[serde(skip_serializing)]
    pub database_url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Send the cookie only over HTTPS
    pub secure_cookie: bool,

    /// Session lifetime without activity
    pub inactivity_minutes: i64,
}

/// Which image host to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageHostKind {
    Cloudinary,
    Mock,
}

impl FromStr for ImageHostKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloudinary" => Ok(ImageHostKind::Cloudinary),
            "mock" => Ok(ImageHostKind::Mock),
            other => anyhow::bail!("unknown IMAGE_HOST '{}' (expected cloudinary or mock)", other),
        }
    }
}

/// Remote image host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub host: ImageHostKind,

    /// Folder uploads are stored under
    pub folder: String,

    /// Credentials, present when `host` is Cloudinary
    pub cloudinary: Option<CloudinaryConfig>,
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        _ => Ok(default),
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let production: bool = parse(&get, "API_PRODUCTION", false)?;

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let api = ApiConfig {
            host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&get, "API_PORT", 8080)?,
            production,
            cors_origins,
            max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        };

        let backend: StoreBackend = parse(&get, "STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = match backend {
            StoreBackend::Postgres => required(&get, "DATABASE_URL")?,
            StoreBackend::Memory => get("DATABASE_URL").unwrap_or_default(),
        };
        let store = StoreConfig {
            backend,
            database_url,
            max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
        };

        let session = SessionConfig {
            secure_cookie: parse(&get, "SESSION_SECURE_COOKIE", production)?,
            inactivity_minutes: parse(&get, "SESSION_INACTIVITY_MINUTES", 14 * 24 * 60)?,
        };
        if session.inactivity_minutes <= 0 {
            anyhow::bail!("SESSION_INACTIVITY_MINUTES must be positive");
        }

        let host: ImageHostKind = parse(&get, "IMAGE_HOST", ImageHostKind::Cloudinary)?;
        let cloudinary = match host {
            ImageHostKind::Cloudinary => {
                let defaults = CloudinaryConfig::default();
                Some(CloudinaryConfig {
                    cloud_name: required(&get, "CLOUDINARY_CLOUD_NAME")?,
                    api_key: required(&get, "CLOUDINARY_API_KEY")?,
                    api_secret: required(&get, "CLOUDINARY_API_SECRET")?,
                    base_url: get("CLOUDINARY_BASE_URL").unwrap_or(defaults.base_url),
                    timeout_seconds: parse(&get, "IMAGE_TIMEOUT_SECONDS", defaults.timeout_seconds)?,
                    signature_algorithm: parse(
                        &get,
                        "CLOUDINARY_SIGNATURE_ALGORITHM",
                        defaults.signature_algorithm,
                    )?,
                })
            }
            ImageHostKind::Mock => None,
        };
        let images = ImageConfig {
            host,
            folder: get("IMAGE_FOLDER").unwrap_or_else(|| "profile_images".to_string()),
            cloudinary,
        };

        Ok(Self {
            api,
            store,
            session,
            images,
        })
    }

    /// Self-contained configuration: memory store, mock image host, loopback
    pub fn local() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                production: false,
                cors_origins: vec!["*".to_string()],
                max_upload_bytes: 10 * 1024 * 1024,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: String::new(),
                max_connections: 10,
            },
            session: SessionConfig {
                secure_cookie: false,
                inactivity_minutes: 14 * 24 * 60,
            },
            images: ImageConfig {
                host: ImageHostKind::Mock,
                folder: "profile_images".to_string(),
                cloudinary: None,
            },
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tasknest_shared::images::SignatureAlgorithm;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_local_matches_env_defaults() {
        let from_env = Config::from_vars(vars(&[
            ("API_HOST", "127.0.0.1"),
            ("STORE_BACKEND", "memory"),
            ("IMAGE_HOST", "mock"),
        ]))
        .unwrap();
        let local = Config::local();
        assert_eq!(
            serde_json::to_value(&from_env).unwrap(),
            serde_json::to_value(&local).unwrap()
        );
    }

    #[test]
    fn test_local_defaults() {
        let config = Config::local();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.images.host, ImageHostKind::Mock);
        assert_eq!(config.images.folder, "profile_images");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.session.secure_cookie);
        assert_eq!(config.session.inactivity_minutes, 20160);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Config::from_vars(vars(&[("IMAGE_HOST", "mock")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = Config::from_vars(vars(&[
            ("IMAGE_HOST", "mock"),
            ("DATABASE_URL", "postgresql://localhost/tasknest"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.max_connections, 4);
    }

    #[test]
    fn test_cloudinary_requires_credentials() {
        let err = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CLOUDINARY_API_KEY"));

        let config = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("IMAGE_TIMEOUT_SECONDS", "5"),
        ]))
        .unwrap();
        let cloudinary = config.images.cloudinary.unwrap();
        assert_eq!(cloudinary.cloud_name, "demo");
        assert_eq!(cloudinary.timeout_seconds, 5);
        assert_eq!(cloudinary.base_url, "https://api.cloudinary.com");
        assert_eq!(cloudinary.signature_algorithm, SignatureAlgorithm::Sha1);
    }

    #[test]
    fn test_cloudinary_signature_algorithm() {
        let cloudinary_vars = |algorithm: &'static str| {
            vars(&[
                ("STORE_BACKEND", "memory"),
                ("CLOUDINARY_CLOUD_NAME", "demo"),
                ("CLOUDINARY_API_KEY", "key"),
                ("CLOUDINARY_API_SECRET", "secret"),
                ("CLOUDINARY_SIGNATURE_ALGORITHM", algorithm),
            ])
        };

        let config = Config::from_vars(cloudinary_vars("sha256")).unwrap();
        assert_eq!(
            config.images.cloudinary.unwrap().signature_algorithm,
            SignatureAlgorithm::Sha256
        );

        let err = Config::from_vars(cloudinary_vars("md5")).unwrap_err();
        assert!(err.to_string().contains("CLOUDINARY_SIGNATURE_ALGORITHM"), "{}", err);
    }

    #[test]
    fn test_production_implies_secure_cookie() {
        let config = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("IMAGE_HOST", "mock"),
            ("API_PRODUCTION", "true"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();
        assert!(config.session.secure_cookie);
        assert_eq!(config.api.cors_origins.len(), 2);

        let config = Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("IMAGE_HOST", "mock"),
            ("API_PRODUCTION", "true"),
            ("SESSION_SECURE_COOKIE", "false"),
        ]))
        .unwrap();
        assert!(!config.session.secure_cookie);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("IMAGE_HOST", "mock"),
            ("API_PORT", "eighty"),
        ]))
        .is_err());
        assert!(Config::from_vars(vars(&[("STORE_BACKEND", "redis"), ("IMAGE_HOST", "mock")])).is_err());
        assert!(Config::from_vars(vars(&[
            ("STORE_BACKEND", "memory"),
            ("IMAGE_HOST", "mock"),
            ("SESSION_INACTIVITY_MINUTES", "0"),
        ]))
        .is_err());
    }
}
