/// Mock image host for development and tests
///
/// Keeps uploaded objects in memory and hands out deterministic-looking URLs:
///
/// ```text
/// https://images.test/mock/image/upload/v1/{folder}/{uuid}.{ext}
/// ```
///
/// Failures can be switched on at runtime to exercise error paths:
///
/// ```
/// use tasknest_shared::images::MockImageHost;
///
/// let host = MockImageHost::new();
/// host.fail_uploads("quota exceeded");
/// host.fail_destroys("service unavailable");
/// host.clear_failures();
/// ```

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::host::{
    DestroyOutcome, ImageHost, ImageHostError, ImageHostResult, ImageUpload, StoredImage,
};

/// Base URL of objects served by the mock host
pub const MOCK_BASE_URL: &str = "https://images.test/mock";

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<String, Bytes>,
    upload_failure: Option<String>,
    destroy_failure: Option<String>,
    uploads: usize,
    destroys: usize,
}

/// In-memory image host
#[derive(Debug, Default)]
pub struct MockImageHost {
    state: Mutex<MockState>,
}

impl MockImageHost {
    /// Creates an empty mock host
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following upload fail with `message`
    pub fn fail_uploads(&self, message: impl Into<String>) {
        self.lock().upload_failure = Some(message.into());
    }

    /// Makes every following destroy fail with `message`
    pub fn fail_destroys(&self, message: impl Into<String>) {
        self.lock().destroy_failure = Some(message.into());
    }

    /// Turns off injected failures
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.upload_failure = None;
        state.destroy_failure = None;
    }

    /// Whether an object with this identifier is stored
    pub fn contains(&self, public_id: &str) -> bool {
        self.lock().objects.contains_key(public_id)
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Number of upload calls (successful or not)
    pub fn upload_calls(&self) -> usize {
        self.lock().uploads
    }

    /// Number of destroy calls (successful or not)
    pub fn destroy_calls(&self) -> usize {
        self.lock().destroys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ImageHost for MockImageHost {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, image: ImageUpload, folder: &str) -> ImageHostResult<StoredImage> {
        let mut state = self.lock();
        state.uploads += 1;

        if let Some(message) = &state.upload_failure {
            return Err(ImageHostError::Provider {
                status: 500,
                message: message.clone(),
            });
        }

        if image.bytes.is_empty() {
            return Err(ImageHostError::InvalidImage("empty file".to_string()));
        }

        let folder = folder.trim_matches('/');
        let name = Uuid::new_v4().simple().to_string();
        let public_id = if folder.is_empty() {
            name
        } else {
            format!("{}/{}", folder, name)
        };
        let extension = image.extension().unwrap_or_else(|| "bin".to_string());
        let secure_url = format!("{}/image/upload/v1/{}.{}", MOCK_BASE_URL, public_id, extension);

        debug!(%public_id, size = image.bytes.len(), "Mock host stored image");
        state.objects.insert(public_id.clone(), image.bytes);

        Ok(StoredImage {
            secure_url,
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> ImageHostResult<DestroyOutcome> {
        let mut state = self.lock();
        state.destroys += 1;

        if let Some(message) = &state.destroy_failure {
            return Err(ImageHostError::Provider {
                status: 500,
                message: message.clone(),
            });
        }

        match state.objects.remove(public_id) {
            Some(_) => Ok(DestroyOutcome::Destroyed),
            None => Ok(DestroyOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::public_id_from_url;

    fn png() -> ImageUpload {
        ImageUpload::new(Bytes::from_static(b"\x89PNG\r\n"), "avatar.png")
    }

    #[tokio::test]
    async fn test_upload_then_destroy() {
        let host = MockImageHost::new();

        let stored = host.upload(png(), "profile_images/").await.unwrap();
        assert!(stored.public_id.starts_with("profile_images/"));
        assert!(stored.secure_url.ends_with(".png"));
        assert!(host.contains(&stored.public_id));

        assert_eq!(
            host.destroy(&stored.public_id).await.unwrap(),
            DestroyOutcome::Destroyed
        );
        assert_eq!(
            host.destroy(&stored.public_id).await.unwrap(),
            DestroyOutcome::NotFound
        );
        assert_eq!(host.object_count(), 0);
        assert_eq!(host.destroy_calls(), 2);
    }

    #[tokio::test]
    async fn test_url_round_trips_to_public_id() {
        let host = MockImageHost::new();
        let stored = host.upload(png(), "profile_images").await.unwrap();
        assert_eq!(
            public_id_from_url(&stored.secure_url).as_deref(),
            Some(stored.public_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let host = MockImageHost::new();
        host.fail_uploads("quota exceeded");

        let err = host.upload(png(), "f").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(host.object_count(), 0);

        host.clear_failures();
        let stored = host.upload(png(), "f").await.unwrap();

        host.fail_destroys("unavailable");
        assert!(host.destroy(&stored.public_id).await.is_err());
        assert!(host.contains(&stored.public_id));
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let host = MockImageHost::new();
        let result = host
            .upload(ImageUpload::new(Bytes::new(), "empty.png"), "f")
            .await;
        assert!(matches!(result, Err(ImageHostError::InvalidImage(_))));
    }
}
