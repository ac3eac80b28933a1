/// Image host trait and types
///
/// The contract consumed from the remote image service is intentionally small:
///
/// ```text
/// upload(bytes, folder) -> { secure_url, public_id }
/// destroy(public_id)    -> Destroyed | NotFound
/// ```
///
/// Hosts must be safe to share across request handlers (`Send + Sync`).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Image host error types
#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    /// The request never got a usable HTTP response (DNS, TLS, timeout, ...)
    #[error("Request to image host failed: {0}")]
    Request(String),

    /// The provider answered with an error
    #[error("Image host returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider answered with something we could not interpret
    #[error("Unexpected response from image host: {0}")]
    InvalidResponse(String),

    /// The upload itself was unusable (e.g. empty payload)
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Host is misconfigured
    #[error("Image host configuration error: {0}")]
    Configuration(String),
}

/// Image host result type alias
pub type ImageHostResult<T> = Result<T, ImageHostError>;

/// Binary image handed to the host
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw file contents
    pub bytes: Bytes,

    /// Original file name, used for the extension
    pub filename: String,

    /// MIME type reported by the client
    pub content_type: Option<String>,
}

impl ImageUpload {
    /// Creates an upload without a content type
    pub fn new(bytes: Bytes, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: None,
        }
    }

    /// Sets the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Lower-cased file extension, if the file name has one
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Where an uploaded image ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Durable HTTPS URL
    pub secure_url: String,

    /// Provider object identifier used for deletion
    pub public_id: String,
}

/// Result of a destroy call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The object existed and was removed
    Destroyed,

    /// The host had no such object
    NotFound,
}

/// Remote image service
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Host name for logging (e.g., "cloudinary", "mock")
    fn name(&self) -> &str;

    /// Stores an image under `folder`
    async fn upload(&self, image: ImageUpload, folder: &str) -> ImageHostResult<StoredImage>;

    /// Deletes the object with the given identifier
    async fn destroy(&self, public_id: &str) -> ImageHostResult<DestroyOutcome>;
}

/// Derives a provider object identifier from a delivery URL
///
/// Only used for records that predate storing `public_id`. For
/// `.../upload/v123/folder/name.png` this yields `folder/name`; for any other
/// URL shape it falls back to the last path segment without its extension.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);

    let tail = match path.split_once("/upload/") {
        Some((_, rest)) => {
            let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            if segments.first().is_some_and(|s| is_version_segment(s)) {
                segments.remove(0);
            }
            segments.join("/")
        }
        None => path.rsplit('/').next().unwrap_or_default().to_string(),
    };

    let id = match tail.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem.to_string(),
        _ => tail,
    };

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}
