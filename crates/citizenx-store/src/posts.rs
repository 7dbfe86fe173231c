use async_trait::async_trait;
use citizenx_model::{NewPost, Post};

use crate::StoreError;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn find_post(&self, id: i64) -> Result<Post, StoreError>;
}
