use async_trait::async_trait;
use citizenx_model::{Blacklist, NewUser, User, UserId, UserImage};
use tracing::debug;

use super::{PgStore, require_row};
use crate::StoreError;
use crate::users::{UserRepository, normalize_token};

/// Maps the partial unique indexes on `users` to the messages callers expect.
fn user_conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some("users_email_key") => {
                return StoreError::Conflict("email already in use".to_string());
            }
            Some("users_username_key") => {
                return StoreError::Conflict("username already in use".to_string());
            }
            Some("users_mac_address_key") => {
                return StoreError::Conflict("mac address already in use".to_string());
            }
            _ => {}
        }
    }
    err.into()
}

impl PgStore {
    async fn user_where(&self, clause: &str, value: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT * FROM users WHERE {clause} LIMIT 1");
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    async fn exists(&self, sql: &str, value: &str) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar::<_, bool>(sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users \
             (fullname, email, username, telephone, hashed_password, mac_address, lga_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.telephone)
        .bind(&user.hashed_password)
        .bind(&user.mac_address)
        .bind(&user.lga_name)
        .fetch_one(&self.pool)
        .await
        .map_err(user_conflict)
    }

    async fn ensure_email_available(&self, email: &str) -> Result<(), StoreError> {
        if self
            .exists(
                "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND email <> '')",
                email,
            )
            .await?
        {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }
        Ok(())
    }

    async fn ensure_phone_available(&self, telephone: &str) -> Result<(), StoreError> {
        if self
            .exists(
                "SELECT EXISTS (SELECT 1 FROM users WHERE telephone = $1)",
                telephone,
            )
            .await?
        {
            return Err(StoreError::Conflict(
                "phone number already in use".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.user_where("$1 <> '' AND (email = $1 OR username = $1)", username)
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.user_where("email = $1 AND email <> ''", email).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    async fn find_by_mac_address(&self, mac_address: &str) -> Result<User, StoreError> {
        self.user_where("mac_address = $1", mac_address).await
    }

    async fn create_user_with_mac_address(&self, user: NewUser) -> Result<User, StoreError> {
        let mac_address = user
            .mac_address
            .as_deref()
            .ok_or_else(|| StoreError::InvalidInput("mac address is required".to_string()))?;

        match self.find_by_mac_address(mac_address).await {
            Ok(existing) => {
                debug!("user {} already registered for {mac_address}", existing.id);
                return Ok(existing);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        // A concurrent registration for the same device may win the insert.
        let inserted = sqlx::query_as::<_, User>(
            "INSERT INTO users \
             (fullname, email, username, telephone, hashed_password, mac_address, lga_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (mac_address) WHERE mac_address IS NOT NULL DO NOTHING \
             RETURNING *",
        )
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.telephone)
        .bind(&user.hashed_password)
        .bind(mac_address)
        .bind(&user.lga_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(user_conflict)?;

        match inserted {
            Some(created) => Ok(created),
            None => self.find_by_mac_address(mac_address).await,
        }
    }

    async fn update_password(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET hashed_password = $1 WHERE email = $2 AND email <> ''",
        )
        .bind(hashed_password)
        .bind(email)
        .execute(&self.pool)
        .await?;
        require_row(result, "user")
    }

    async fn reset_password(&self, id: UserId, hashed_password: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
            .bind(hashed_password)
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, "user")
    }

    async fn edit_profile(
        &self,
        id: UserId,
        fullname: &str,
        username: &str,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET fullname = $1, username = $2 WHERE id = $3 RETURNING *",
        )
        .bind(fullname)
        .bind(username)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(user_conflict)?
        .ok_or(StoreError::NotFound("user"))
    }

    async fn verify_email(&self, email: &str, token: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET is_email_active = TRUE WHERE email = $1 AND email <> ''",
        )
        .bind(email)
        .execute(&mut *tx)
        .await?;
        require_row(result, "user")?;

        sqlx::query("INSERT INTO blacklists (token) VALUES ($1)")
            .bind(normalize_token(token))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_online_status(&self, id: UserId, online: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET online = $1 WHERE id = $2")
            .bind(online)
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, "user")
    }

    async fn online_user_count(&self) -> Result<i64, StoreError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE online")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn total_user_count(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn user_count_in_lga(&self, lga: &str) -> Result<i64, StoreError> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE lga_name = $1")
                .bind(lga)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn all_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn add_to_blacklist(&self, token: &str) -> Result<Blacklist, StoreError> {
        Ok(sqlx::query_as::<_, Blacklist>(
            "INSERT INTO blacklists (token) VALUES ($1) RETURNING token, created_at",
        )
        .bind(normalize_token(token))
        .fetch_one(&self.pool)
        .await?)
    }

    async fn is_token_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM blacklists WHERE token = $1)",
            normalize_token(token),
        )
        .await
    }

    async fn create_user_image(
        &self,
        user_id: UserId,
        thumbnail_url: &str,
    ) -> Result<UserImage, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE users SET thumbnail_url = $1 WHERE id = $2")
            .bind(thumbnail_url)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        require_row(result, "user")?;

        let image = sqlx::query_as::<_, UserImage>(
            "INSERT INTO user_images (user_id, thumbnail_url) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(thumbnail_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::testing;

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn user_lifecycle() {
        let store = testing::store().await;
        let email = format!("{}@example.ng", unique("user"));
        let user = store
            .create_user(NewUser {
                fullname: "Ada Obi".to_string(),
                email: email.clone(),
                username: unique("ada"),
                hashed_password: "hash".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();

        assert_eq!(store.find_by_username(&email).await.unwrap().id, user.id);
        assert!(store.ensure_email_available(&email).await.unwrap_err().is_conflict());

        store.set_online_status(user.id, true).await.unwrap();
        assert!(store.find_by_id(user.id).await.unwrap().online);

        let token = unique("token");
        store.verify_email(&email, &format!(" {token} ")).await.unwrap();
        assert!(store.find_by_email(&email).await.unwrap().is_email_active);
        assert!(store.is_token_blacklisted(&token).await.unwrap());

        let image = store
            .create_user_image(user.id, "https://cdn.example/1_me.png")
            .await
            .unwrap();
        assert_eq!(image.user_id, user.id);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn mac_address_registration_is_idempotent() {
        let store = testing::store().await;
        let mac = unique("mac");

        let first = store
            .create_user_with_mac_address(NewUser::from_mac_address(&mac))
            .await
            .unwrap();
        let second = store
            .create_user_with_mac_address(NewUser::from_mac_address(&mac))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_mac_registrations_share_one_user() {
        let store = testing::store().await;
        let mac = unique("mac");

        let registrations = (0..8).map(|_| {
            let store = store.clone();
            let mac = mac.clone();
            tokio::spawn(async move {
                store
                    .create_user_with_mac_address(NewUser::from_mac_address(mac))
                    .await
                    .unwrap()
                    .id
            })
        });
        let mut ids = Vec::new();
        for handle in registrations.collect::<Vec<_>>() {
            ids.push(handle.await.unwrap());
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE mac_address = $1")
            .bind(&mac)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn empty_identity_never_matches_device_accounts() {
        let store = testing::store().await;
        let device = store
            .create_user_with_mac_address(NewUser::from_mac_address(unique("mac")))
            .await
            .unwrap();

        assert!(store.find_by_username("").await.unwrap_err().is_not_found());
        assert!(store.find_by_email("").await.unwrap_err().is_not_found());
        assert!(store.ensure_email_available("").await.is_ok());
        assert!(store.update_password("", "other-hash").await.unwrap_err().is_not_found());
        assert_eq!(store.find_by_id(device.id).await.unwrap().hashed_password, "");
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn missing_users_are_not_found() {
        let store = testing::store().await;

        assert!(store.find_by_id(-1).await.unwrap_err().is_not_found());
        assert!(store.set_offline(-1).await.unwrap_err().is_not_found());
        assert!(
            store
                .update_password("nobody@example.ng", "x")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
