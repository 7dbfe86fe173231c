use async_trait::async_trait;
use citizenx_model::{Blacklist, NewUser, User, UserId, UserImage};

use crate::StoreError;

/// Account records, presence flags and the revoked-token list.
///
/// Lookups report a miss as [`StoreError::NotFound`], never as a generic failure.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. A taken email or username is a [`StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn ensure_email_available(&self, email: &str) -> Result<(), StoreError>;

    async fn ensure_phone_available(&self, telephone: &str) -> Result<(), StoreError>;

    /// Matches `username` against both the email and username columns.
    async fn find_by_username(&self, username: &str) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError>;

    async fn find_by_mac_address(&self, mac_address: &str) -> Result<User, StoreError>;

    /// Find-or-create keyed by MAC address: an existing user with the same address is
    /// returned unchanged, otherwise `user` is inserted.
    async fn create_user_with_mac_address(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update_password(&self, email: &str, hashed_password: &str)
    -> Result<(), StoreError>;

    async fn reset_password(&self, id: UserId, hashed_password: &str) -> Result<(), StoreError>;

    async fn edit_profile(
        &self,
        id: UserId,
        fullname: &str,
        username: &str,
    ) -> Result<User, StoreError>;

    /// Marks the email as verified and revokes the verification token.
    async fn verify_email(&self, email: &str, token: &str) -> Result<(), StoreError>;

    async fn set_online_status(&self, id: UserId, online: bool) -> Result<(), StoreError>;

    async fn set_offline(&self, id: UserId) -> Result<(), StoreError> {
        self.set_online_status(id, false).await
    }

    async fn online_user_count(&self) -> Result<i64, StoreError>;

    async fn total_user_count(&self) -> Result<i64, StoreError>;

    async fn user_count_in_lga(&self, lga: &str) -> Result<i64, StoreError>;

    async fn all_users(&self) -> Result<Vec<User>, StoreError>;

    /// Revokes a token. Tokens are trimmed of surrounding whitespace first.
    async fn add_to_blacklist(&self, token: &str) -> Result<Blacklist, StoreError>;

    async fn is_token_blacklisted(&self, token: &str) -> Result<bool, StoreError>;

    /// Records a new profile image and makes it the user's current thumbnail.
    async fn create_user_image(
        &self,
        user_id: UserId,
        thumbnail_url: &str,
    ) -> Result<UserImage, StoreError>;
}

pub(crate) fn normalize_token(token: &str) -> &str {
    token.trim()
}
