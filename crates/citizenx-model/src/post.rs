use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// A photo post created through the multipart upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Post {
    pub id: i64,
    pub user_id: UserId,
    pub title: String,
    #[serde(rename = "post_category")]
    pub category: String,
    #[serde(rename = "post_description")]
    pub description: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub user_id: UserId,
    pub title: String,
    pub category: String,
    pub description: String,
    pub image: String,
}

impl NewPost {
    pub fn into_post(self, id: i64, created_at: DateTime<Utc>) -> Post {
        Post {
            id,
            user_id: self.user_id,
            title: self.title,
            category: self.category,
            description: self.description,
            image: self.image,
            created_at,
        }
    }
}
