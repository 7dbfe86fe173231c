//! Request handlers, grouped by resource.

pub mod dashboard;
pub mod posts;
pub mod reports;
pub mod users;

use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use citizenx_model::Page;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Query` whose rejection is rendered as a JSON [`ApiError`].
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// `Path` whose rejection is rendered as a JSON [`ApiError`].
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, ApiError> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(ApiPath(value))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    /// Requested page; absent, zero and negative values all mean the first page.
    pub fn page(&self) -> Page {
        match self.page {
            Some(n) => Page::new(n.clamp(1, i64::from(u32::MAX)) as u32),
            None => Page::FIRST,
        }
    }
}
