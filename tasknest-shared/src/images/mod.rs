/// Remote image hosting
///
/// Profile pictures are stored on a third-party image host. This module
/// defines the contract TaskNest relies on and its implementations.
///
/// # Modules
///
/// - [`host`]: The `ImageHost` trait and shared types
/// - [`cloudinary`]: Cloudinary upload API client
/// - [`mock`]: In-process host for development and tests
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use tasknest_shared::images::{ImageHost, ImageUpload, MockImageHost};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let host = MockImageHost::new();
/// let stored = host
///     .upload(ImageUpload::new(Bytes::from_static(b"\x89PNG"), "me.png"), "profile_images")
///     .await?;
///
/// host.destroy(&stored.public_id).await?;
/// # Ok(())
/// # }
/// ```

pub mod cloudinary;
pub mod host;
pub mod mock;

pub use cloudinary::{CloudinaryConfig, CloudinaryHost, SignatureAlgorithm};
pub use host::{
    public_id_from_url, DestroyOutcome, ImageHost, ImageHostError, ImageHostResult, ImageUpload,
    StoredImage,
};
pub use mock::MockImageHost;
