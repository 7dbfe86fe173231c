//! HTTP API for CitizenX.
//!
//! [`create_app`] builds the full router over an [`AppState`]. Handlers only talk to
//! the repository and object-store traits, so the same router runs against PostgreSQL
//! and S3 in production and against in-memory backends in tests.

#![forbid(unsafe_code)]

pub mod args;
pub mod auth;
pub mod error;
pub mod routes;
pub mod upload;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use citizenx_store::{IncidentReportRepository, ObjectStore, PostRepository, UserRepository};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use crate::auth::{AuthUser, issue_token};
pub use crate::error::ApiError;

/// Room for the multipart framing and text fields around an image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub reports: Arc<dyn IncidentReportRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub objects: Arc<dyn ObjectStore>,
    pub jwt_secret: Arc<str>,
    pub max_upload_bytes: usize,
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the Axum router with all routes configured
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    let api = Router::new()
        .route("/posts", post(routes::posts::create_post))
        .route("/auth/logout", post(routes::users::logout))
        .route("/users/me/image", post(routes::users::upload_profile_image))
        .route("/users/count", get(routes::users::user_counts))
        .route("/users/lga/{lga}/count", get(routes::users::user_count_in_lga))
        .route("/reports", get(routes::reports::list_reports))
        .route("/reports/state/{state}", get(routes::reports::reports_by_state))
        .route("/reports/lga/{lga}", get(routes::reports::reports_by_lga))
        .route(
            "/reports/category/{category}",
            get(routes::reports::reports_by_category),
        )
        .route("/reports/{id}", get(routes::reports::get_report))
        .route("/reports/{id}/status", get(routes::reports::report_status))
        .route("/reports/{id}/bookmark", post(routes::reports::bookmark_report))
        .nest("/dashboard", routes::dashboard::router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
