use async_trait::async_trait;
use citizenx_model::{NewPost, Post};

use super::PgStore;
use crate::StoreError;
use crate::posts::PostRepository;

#[async_trait]
impl PostRepository for PgStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        Ok(sqlx::query_as::<_, Post>(
            "INSERT INTO posts (user_id, title, category, description, image) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.category)
        .bind(&post.description)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_post(&self, id: i64) -> Result<Post, StoreError> {
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("post"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::testing;

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn post_round_trip() {
        let store = testing::store().await;
        let post = store
            .create_post(NewPost {
                user_id: 9,
                title: "Broken streetlight".to_string(),
                category: "Infrastructure".to_string(),
                description: "Dark since Monday".to_string(),
                image: "https://cdn.example/9_light.jpg".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.find_post(post.id).await.unwrap().title, post.title);
    }
}
