/// Profile image endpoints
///
/// Each user owns at most one profile image. The bytes live on the image host;
/// the store keeps the URL and the host's object identifier.
///
/// # Endpoints
///
/// - `POST /profile` - Upload (multipart `student` + `image`)
/// - `GET /profile/:id` - Any authenticated caller may read
/// - `PUT|PATCH /profile/:id` - Swap the image (multipart, `image` optional)
/// - `DELETE /profile/:id` - Remove the remote object, then the record
///
/// Remote and local state are kept consistent by ordering: uploads happen
/// before the record changes and are destroyed again if the write fails;
/// deletion removes the remote object before the record.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, Enveloped},
};
use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use tasknest_shared::{
    auth::{
        authorization::{require_ownership, Action},
        middleware::AuthContext,
    },
    images::{DestroyOutcome, ImageHostError, ImageUpload},
    models::profile_image::{CreateProfileImage, ProfileImage},
    store::DUPLICATE_PROFILE_IMAGE,
};
use uuid::Uuid;

const MISSING_PARTS: &str = "Student ID and image file are required.";

/// `{"status": "success", "data": ...}`
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> SuccessEnvelope<T> {
    fn new(data: T) -> Json<Self> {
        Json(Self {
            status: "success",
            data,
        })
    }
}

/// Parts collected from a profile image form
#[derive(Debug, Default)]
struct ProfileForm {
    student: Option<String>,
    image: Option<ImageUpload>,
}

async fn read_image(field: Field<'_>) -> ApiResult<Option<ImageUpload>> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().map(str::to_string);

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;

    if bytes.is_empty() {
        return Ok(None);
    }

    let upload = ImageUpload::new(bytes, filename);
    Ok(Some(match content_type {
        Some(ct) => upload.with_content_type(ct),
        None => upload,
    }))
}

async fn read_form(multipart: &mut Multipart) -> ApiResult<ProfileForm> {
    let mut form = ProfileForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!(error = %e, "Malformed multipart body");
        ApiError::BadRequest(format!("Malformed form data: {}", e))
    })? {
        match field.name().unwrap_or("") {
            "student" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read student: {}", e)))?;
                let value = value.trim().to_string();
                form.student = (!value.is_empty()).then_some(value);
            }
            "image" => form.image = read_image(field).await?,
            other => tracing::debug!(field = other, "Ignoring form field"),
        }
    }

    Ok(form)
}

fn parse_profile_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Profile image not found.".to_string()))
}

/// Best-effort removal of an object nothing references any more
async fn discard_object(state: &AppState, public_id: &str) {
    match state.images.destroy(public_id).await {
        Ok(DestroyOutcome::Destroyed) => {
            tracing::debug!(public_id, "Removed unreferenced image");
        }
        Ok(DestroyOutcome::NotFound) => {
            tracing::warn!(public_id, "Unreferenced image already gone");
        }
        Err(e) => {
            tracing::warn!(public_id, error = %e, "Failed to remove unreferenced image");
        }
    }
}

fn upload_failed(err: ImageHostError) -> ApiError {
    ApiError::RemoteServiceError(format!("Image upload failed: {}", err))
}

/// Upload a profile image
///
/// # Errors
///
/// - `400 Bad Request`: Missing `student` or `image`, malformed student id
/// - `403 Forbidden`: `student` is not the caller
/// - `409 Conflict`: The student already has a profile image
/// - `500 Internal Server Error`: The image host rejected the upload
pub async fn create_profile_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SuccessEnvelope<ProfileImage>>), Enveloped> {
    let form = read_form(&mut multipart).await?;

    let (student, image) = match (form.student, form.image) {
        (Some(student), Some(image)) => (student, image),
        _ => return Err(ApiError::BadRequest(MISSING_PARTS.to_string()).into()),
    };

    let student_id = Uuid::parse_str(&student)
        .map_err(|_| ApiError::BadRequest(format!("Invalid student ID: {}", student)))?;

    require_ownership(&auth, student_id, Action::ModifyProfileImage).map_err(ApiError::from)?;

    if state
        .store
        .find_profile_image_by_student(student_id)
        .await
        .map_err(ApiError::from)?
        .is_some()
    {
        return Err(ApiError::Conflict(DUPLICATE_PROFILE_IMAGE.to_string()).into());
    }

    let stored = state
        .images
        .upload(image, state.image_folder())
        .await
        .map_err(upload_failed)?;

    let public_id = stored.public_id.clone();
    let record = match state
        .store
        .create_profile_image(
            &auth,
            CreateProfileImage {
                student_id,
                image: stored,
            },
        )
        .await
    {
        Ok(record) => record,
        Err(e) => {
            discard_object(&state, &public_id).await;
            return Err(ApiError::from(e).into());
        }
    };

    tracing::info!(
        profile_image_id = %record.id,
        user_id = %auth.user_id,
        host = state.images.name(),
        "Profile image uploaded"
    );

    Ok((StatusCode::CREATED, SuccessEnvelope::new(record)))
}

/// Get a profile image
pub async fn get_profile_image(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessEnvelope<ProfileImage>>> {
    let id = parse_profile_id(&id)?;
    let record = state.store.get_profile_image(id).await?;
    Ok(SuccessEnvelope::new(record))
}

/// Swap the image behind a profile record
///
/// Without an `image` part the record is returned unchanged. The old remote
/// object is removed only after the record points at the new one.
///
/// # Errors
///
/// - `403 Forbidden`: Not the caller's profile image
/// - `404 Not Found`: No such record
/// - `500 Internal Server Error`: Upload failed; the old image is kept
pub async fn replace_profile_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProfileImage>> {
    let id = parse_profile_id(&id)?;
    let form = read_form(&mut multipart).await?;

    let current = state.store.authorize_profile_image(&auth, id).await?;

    let Some(image) = form.image else {
        return Ok(Json(current));
    };

    let stored = state
        .images
        .upload(image, state.image_folder())
        .await
        .map_err(upload_failed)?;

    let new_object = stored.public_id.clone();
    let replaced = match state.store.replace_profile_image(&auth, id, stored).await {
        Ok(replaced) => replaced,
        Err(e) => {
            discard_object(&state, &new_object).await;
            return Err(e.into());
        }
    };

    if let Some(previous) = replaced.previous_object.as_deref() {
        if previous != new_object {
            discard_object(&state, previous).await;
        }
    }

    tracing::info!(profile_image_id = %id, user_id = %auth.user_id, "Profile image replaced");
    Ok(Json(replaced.record))
}

/// Delete a profile image
///
/// # Errors
///
/// - `403 Forbidden`: Not the caller's profile image
/// - `404 Not Found`: No such record
/// - `409 Conflict`: The image was replaced during the delete; the new record
///   is kept
/// - `500 Internal Server Error`: The remote object could not be removed; the
///   record is kept
pub async fn delete_profile_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_profile_id(&id)?;
    let record = state.store.authorize_profile_image(&auth, id).await?;
    let destroyed = record.remote_object_id();

    if let Some(public_id) = &destroyed {
        match state.images.destroy(public_id).await {
            Ok(DestroyOutcome::Destroyed) => {}
            Ok(DestroyOutcome::NotFound) => {
                tracing::warn!(%public_id, "Remote image already gone");
            }
            Err(e) => {
                return Err(ApiError::RemoteServiceError(format!(
                    "Failed to delete remote image: {}",
                    e
                )));
            }
        }
    }

    // a replace that landed after the destroy keeps its row
    state
        .store
        .delete_profile_image(&auth, id, destroyed.as_deref())
        .await?;

    tracing::info!(profile_image_id = %id, user_id = %auth.user_id, "Profile image deleted");
    Ok(StatusCode::NO_CONTENT)
}
