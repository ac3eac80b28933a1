/// Cloudinary image host
///
/// Talks to the Cloudinary upload API using signed requests:
///
/// ```text
/// POST {base_url}/v1_1/{cloud_name}/image/upload    (file, folder, timestamp, api_key, signature)
/// POST {base_url}/v1_1/{cloud_name}/image/destroy   (public_id, timestamp, api_key, signature)
/// ```
///
/// The signature is the hex digest of the signed parameters, sorted by name
/// and joined as `k=v&k=v`, followed by the API secret. Accounts sign with
/// SHA-1 unless they were switched to SHA-256, in which case requests also
/// carry `signature_algorithm=sha256`.
///
/// # Example
///
/// ```no_run
/// use tasknest_shared::images::{CloudinaryConfig, CloudinaryHost};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let host = CloudinaryHost::new(CloudinaryConfig {
///     cloud_name: "demo".to_string(),
///     api_key: "1234".to_string(),
///     api_secret: "secret".to_string(),
///     ..Default::default()
/// })?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::host::{
    DestroyOutcome, ImageHost, ImageHostError, ImageHostResult, ImageUpload, StoredImage,
};

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";

/// Digest used for request signatures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// Cloudinary's default
    #[default]
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => "sha1",
            SignatureAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = ImageHostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            other => Err(ImageHostError::Configuration(format!(
                "unknown signature algorithm '{}' (expected sha1 or sha256)",
                other
            ))),
        }
    }
}

/// Cloudinary credentials and client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    /// Cloud name (account identifier)
    pub cloud_name: String,

    /// API key
    pub api_key: String,

    /// API secret used for request signing
    ///
    /// IMPORTANT: never log this value.
    #[serde(skip_serializing)]
    pub api_secret: String,

    /// API base URL (overridable for tests and proxies)
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Must match the account's signature setting
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            signature_algorithm: SignatureAlgorithm::default(),
        }
    }
}

/// Successful upload response (subset)
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

/// Destroy response
#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Error envelope: `{"error": {"message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary-backed image host
pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryHost {
    /// Creates a client
    ///
    /// # Errors
    ///
    /// Returns `ImageHostError::Configuration` if credentials are missing or
    /// the HTTP client cannot be built.
    pub fn new(config: CloudinaryConfig) -> ImageHostResult<Self> {
        if config.cloud_name.is_empty() || config.api_key.is_empty() || config.api_secret.is_empty()
        {
            return Err(ImageHostError::Configuration(
                "cloud_name, api_key and api_secret are required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ImageHostError::Configuration(format!("HTTP client: {}", e)))?;

        info!(
            cloud_name = %config.cloud_name,
            base_url = %config.base_url,
            signature_algorithm = %config.signature_algorithm,
            "Cloudinary image host configured"
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Signs the given parameters with the API secret
    pub fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.config.api_secret, self.config.signature_algorithm)
    }

    /// Adds the credential fields every signed request carries
    fn signed_form(&self, form: Form, timestamp: String, signature: String) -> Form {
        let form = form
            .text("timestamp", timestamp)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);

        match self.config.signature_algorithm {
            SignatureAlgorithm::Sha1 => form,
            SignatureAlgorithm::Sha256 => form.text("signature_algorithm", "sha256"),
        }
    }

    async fn send(&self, action: &str, form: Form) -> ImageHostResult<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(action))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageHostError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body
                }
            });

        warn!(action, status = status.as_u16(), %message, "Cloudinary request rejected");
        Err(ImageHostError::Provider {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(&self, image: ImageUpload, folder: &str) -> ImageHostResult<StoredImage> {
        if image.bytes.is_empty() {
            return Err(ImageHostError::InvalidImage("empty file".to_string()));
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", folder), ("timestamp", &timestamp)]);

        let mut file = Part::bytes(image.bytes.to_vec()).file_name(image.filename.clone());
        if let Some(content_type) = &image.content_type {
            file = file
                .mime_str(content_type)
                .map_err(|e| ImageHostError::InvalidImage(format!("content type: {}", e)))?;
        }

        let form = self.signed_form(
            Form::new()
                .part("file", file)
                .text("folder", folder.to_string()),
            timestamp,
            signature,
        );

        debug!(filename = %image.filename, size = image.bytes.len(), folder, "Uploading image to Cloudinary");

        let uploaded: UploadResponse = self
            .send("upload", form)
            .await?
            .json()
            .await
            .map_err(|e| ImageHostError::InvalidResponse(e.to_string()))?;

        info!(public_id = %uploaded.public_id, "Image uploaded to Cloudinary");

        Ok(StoredImage {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> ImageHostResult<DestroyOutcome> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let form = self.signed_form(
            Form::new().text("public_id", public_id.to_string()),
            timestamp,
            signature,
        );

        let destroyed: DestroyResponse = self
            .send("destroy", form)
            .await?
            .json()
            .await
            .map_err(|e| ImageHostError::InvalidResponse(e.to_string()))?;

        match destroyed.result.as_str() {
            "ok" => {
                info!(public_id, "Image destroyed on Cloudinary");
                Ok(DestroyOutcome::Destroyed)
            }
            "not found" => {
                debug!(public_id, "Image already absent on Cloudinary");
                Ok(DestroyOutcome::NotFound)
            }
            other => Err(ImageHostError::InvalidResponse(format!(
                "destroy result '{}'",
                other
            ))),
        }
    }
}

/// Computes a Cloudinary request signature
///
/// Parameters are sorted by name, joined as `k=v&k=v`, the secret is appended
/// and the result is hashed with `algorithm`.
pub fn sign_params(
    params: &[(&str, &str)],
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    match algorithm {
        SignatureAlgorithm::Sha1 => hex_digest::<Sha1>(&to_sign, api_secret),
        SignatureAlgorithm::Sha256 => hex_digest::<Sha256>(&to_sign, api_secret),
    }
}

fn hex_digest<D: Digest>(to_sign: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
