/// Profile image model and database operations
///
/// Each user has at most one profile image row. The image bytes live on the
/// remote image host; the row keeps the durable URL and the provider's object
/// identifier (`public_id`) needed to delete the remote object later.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profile_images (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     student_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     image_url VARCHAR(500),
///     public_id VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::images::{public_id_from_url, StoredImage};

/// Profile image record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileImage {
    /// Unique record ID
    pub id: Uuid,

    /// User this image belongs to (one-to-one)
    #[serde(rename = "student")]
    pub student_id: Uuid,

    /// Durable URL on the image host
    pub image_url: Option<String>,

    /// Provider object identifier, recorded at upload time
    #[serde(skip_serializing)]
    pub public_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile image row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileImage {
    /// Owning user
    pub student_id: Uuid,

    /// Where the uploaded object lives
    pub image: StoredImage,
}

impl ProfileImage {
    /// Identifier of the remote object backing this record, if any
    ///
    /// Rows written before `public_id` was recorded fall back to deriving it
    /// from the URL.
    pub fn remote_object_id(&self) -> Option<String> {
        self.public_id
            .clone()
            .or_else(|| self.image_url.as_deref().and_then(public_id_from_url))
    }
}

const PROFILE_IMAGE_COLUMNS: &str = "id, student_id, image_url, public_id, created_at, updated_at";

impl ProfileImage {
    /// Creates a profile image row
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the student already has an image.
    pub async fn create<'e, E>(executor: E, data: CreateProfileImage) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO profile_images (student_id, image_url, public_id)
             VALUES ($1, $2, $3)
             RETURNING {PROFILE_IMAGE_COLUMNS}"
        );

        sqlx::query_as::<_, ProfileImage>(&query)
            .bind(data.student_id)
            .bind(data.image.secure_url)
            .bind(data.image.public_id)
            .fetch_one(executor)
            .await
    }

    /// Finds a profile image by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {PROFILE_IMAGE_COLUMNS} FROM profile_images WHERE id = $1");

        sqlx::query_as::<_, ProfileImage>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a profile image by ID and locks the row until the transaction ends
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {PROFILE_IMAGE_COLUMNS} FROM profile_images WHERE id = $1 FOR UPDATE"
        );

        sqlx::query_as::<_, ProfileImage>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds the profile image belonging to a student
    pub async fn find_by_student<'e, E>(
        executor: E,
        student_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {PROFILE_IMAGE_COLUMNS} FROM profile_images WHERE student_id = $1"
        );

        sqlx::query_as::<_, ProfileImage>(&query)
            .bind(student_id)
            .fetch_optional(executor)
            .await
    }

    /// Points the record at a newly uploaded object
    pub async fn set_image<'e, E>(
        executor: E,
        id: Uuid,
        image: StoredImage,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE profile_images
             SET image_url = $2, public_id = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {PROFILE_IMAGE_COLUMNS}"
        );

        sqlx::query_as::<_, ProfileImage>(&query)
            .bind(id)
            .bind(image.secure_url)
            .bind(image.public_id)
            .fetch_optional(executor)
            .await
    }

    /// Deletes a profile image row
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM profile_images WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image_url: Option<&str>, public_id: Option<&str>) -> ProfileImage {
        ProfileImage {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            image_url: image_url.map(str::to_string),
            public_id: public_id.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_remote_object_id_prefers_stored_public_id() {
        let image = record(
            Some("https://res.cloudinary.com/demo/image/upload/v1/profile_images/abc.png"),
            Some("profile_images/stored"),
        );
        assert_eq!(image.remote_object_id().as_deref(), Some("profile_images/stored"));
    }

    #[test]
    fn test_remote_object_id_falls_back_to_url() {
        let image = record(
            Some("https://res.cloudinary.com/demo/image/upload/v1712/profile_images/abc.png"),
            None,
        );
        assert_eq!(image.remote_object_id().as_deref(), Some("profile_images/abc"));
    }

    #[test]
    fn test_remote_object_id_absent() {
        assert_eq!(record(None, None).remote_object_id(), None);
    }

    #[test]
    fn test_serialization_shape() {
        let image = record(Some("https://images.test/a.png"), Some("a"));
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["student"], serde_json::json!(image.student_id));
        assert_eq!(json["image_url"], "https://images.test/a.png");
        assert!(json.get("public_id").is_none());
    }
}
