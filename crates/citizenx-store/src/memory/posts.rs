use async_trait::async_trait;
use chrono::Utc;
use citizenx_model::{NewPost, Post};

use super::MemoryStore;
use crate::StoreError;
use crate::posts::PostRepository;

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let post = post.into_post(id, Utc::now());
        tables.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> Result<Post, StoreError> {
        self.tables()
            .posts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_post_can_be_found() {
        let store = MemoryStore::new();
        let post = store
            .create_post(NewPost {
                user_id: 4,
                title: "Pothole".to_string(),
                category: "Roads".to_string(),
                description: "Deep pothole on the ring road".to_string(),
                image: "https://bucket.example/4_hole.jpg".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.find_post(post.id).await.unwrap(), post);
        assert!(store.find_post(post.id + 1).await.unwrap_err().is_not_found());
    }
}
