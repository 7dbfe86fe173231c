use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use citizenx_model::{NewPost, Post};
use citizenx_store::object_key;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::upload::ImageForm;

pub const IMAGE_FIELD: &str = "postImage";
pub const REQUIRED_FIELDS: &str = "Title, category, and description are required";
pub const CREATED: &str = "Post created successfully";

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostResponse {
    pub message: String,
    pub post: Post,
}

/// `POST /api/v1/posts`: stores the image, then the post that points at it.
///
/// Everything is validated before the upload, so a rejected request never leaves an
/// object behind. An object uploaded before a failed insert is kept.
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CreatePostResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut form = ImageForm::read(multipart, IMAGE_FIELD).await?;
    let image = form.take_image(state.max_upload_bytes)?;

    let title = form.field("title");
    let category = form.field("post_category");
    let description = form.field("post_description");
    if title.is_empty() || category.is_empty() || description.is_empty() {
        return Err(ApiError::bad_request(REQUIRED_FIELDS));
    }

    let key = object_key(user.id, &image.filename);
    let url = state
        .objects
        .put_object(&key, image.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to upload file to S3", e))?;

    let post = state
        .posts
        .create_post(NewPost {
            user_id: user.id,
            title: title.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            image: url,
        })
        .await
        .map_err(|e| ApiError::internal("Failed to create post", e))?;

    info!("user {} created post {}", user.id, post.id);
    Ok(Json(CreatePostResponse {
        message: CREATED.to_string(),
        post,
    }))
}
