use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use citizenx_model::UserImage;
use citizenx_store::object_key;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::ApiPath;
use crate::upload::ImageForm;

pub const PROFILE_IMAGE_FIELD: &str = "profileImage";

#[derive(Debug, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: i64,
    pub online: i64,
}

/// `POST /api/v1/auth/logout`: revokes the presented token and marks the user offline.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    state.users.add_to_blacklist(&user.token).await?;
    match state.users.set_offline(user.id).await {
        Ok(()) => {}
        // Device tokens may outlive their user row; the token is revoked regardless.
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    info!("user {} logged out", user.id);
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// `POST /api/v1/users/me/image`: uploads a new profile picture.
pub async fn upload_profile_image(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UserImage>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = ImageForm::read(multipart, PROFILE_IMAGE_FIELD).await?;
    let image = form.take_image(state.max_upload_bytes)?;

    // Fail before uploading when the account does not exist.
    state.users.find_by_id(user.id).await?;

    let key = object_key(user.id, &image.filename);
    let url = state
        .objects
        .put_object(&key, image.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to upload file to S3", e))?;

    let stored = state.users.create_user_image(user.id, &url).await?;
    Ok(Json(stored))
}

pub async fn user_counts(State(state): State<AppState>) -> Result<Json<UserCounts>, ApiError> {
    Ok(Json(UserCounts {
        total: state.users.total_user_count().await?,
        online: state.users.online_user_count().await?,
    }))
}

pub async fn user_count_in_lga(
    State(state): State<AppState>,
    ApiPath(lga): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let count = state.users.user_count_in_lga(&lga).await?;
    Ok(Json(json!({ "lga": lga, "count": count })))
}
