use async_trait::async_trait;
use chrono::Utc;
use citizenx_model::{Blacklist, NewUser, User, UserId, UserImage};
use tracing::debug;

use super::{MemoryStore, Tables};
use crate::StoreError;
use crate::users::{UserRepository, normalize_token};

impl Tables {
    fn insert_user(&mut self, user: NewUser) -> Result<User, StoreError> {
        let taken = |field: fn(&User) -> &str, value: &str| {
            !value.is_empty() && self.users.values().any(|u| field(u) == value)
        };
        if taken(|u| &u.email, &user.email) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }
        if taken(|u| &u.username, &user.username) {
            return Err(StoreError::Conflict("username already in use".to_string()));
        }
        let mac = user.mac_address.as_deref();
        if mac.is_some() && self.users.values().any(|u| u.mac_address.as_deref() == mac) {
            return Err(StoreError::Conflict("mac address already in use".to_string()));
        }

        let id = self.next_id();
        let user = user.into_user(id, Utc::now());
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut User, StoreError> {
        self.users.get_mut(&id).ok_or(StoreError::NotFound("user"))
    }

    fn user_by_email_mut(&mut self, email: &str) -> Result<&mut User, StoreError> {
        self.users
            .values_mut()
            .find(|u| !email.is_empty() && u.email == email)
            .ok_or(StoreError::NotFound("user"))
    }

    fn find_user(&self, pred: impl Fn(&User) -> bool) -> Result<User, StoreError> {
        self.users
            .values()
            .find(|u| pred(u))
            .cloned()
            .ok_or(StoreError::NotFound("user"))
    }

    fn blacklist_token(&mut self, token: &str) -> Blacklist {
        let entry = Blacklist {
            token: normalize_token(token).to_string(),
            created_at: Utc::now(),
        };
        self.blacklist.push(entry.clone());
        entry
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.tables().insert_user(user)
    }

    async fn ensure_email_available(&self, email: &str) -> Result<(), StoreError> {
        if !email.is_empty() && self.tables().users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict("email already in use".to_string()));
        }
        Ok(())
    }

    async fn ensure_phone_available(&self, telephone: &str) -> Result<(), StoreError> {
        let tables = self.tables();
        if tables
            .users
            .values()
            .any(|u| u.telephone.as_deref() == Some(telephone))
        {
            return Err(StoreError::Conflict(
                "phone number already in use".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        if username.is_empty() {
            return Err(StoreError::NotFound("user"));
        }
        self.tables()
            .find_user(|u| u.email == username || u.username == username)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.tables()
            .find_user(|u| !email.is_empty() && u.email == email)
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.tables().find_user(|u| u.id == id)
    }

    async fn find_by_mac_address(&self, mac_address: &str) -> Result<User, StoreError> {
        self.tables()
            .find_user(|u| u.mac_address.as_deref() == Some(mac_address))
    }

    async fn create_user_with_mac_address(&self, user: NewUser) -> Result<User, StoreError> {
        let mac_address = user
            .mac_address
            .clone()
            .ok_or_else(|| StoreError::InvalidInput("mac address is required".to_string()))?;

        let mut tables = self.tables();
        match tables.find_user(|u| u.mac_address.as_deref() == Some(mac_address.as_str())) {
            Ok(existing) => {
                debug!("user {} already registered for {mac_address}", existing.id);
                Ok(existing)
            }
            Err(StoreError::NotFound(_)) => tables.insert_user(user),
            Err(e) => Err(e),
        }
    }

    async fn update_password(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<(), StoreError> {
        self.tables().user_by_email_mut(email)?.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn reset_password(&self, id: UserId, hashed_password: &str) -> Result<(), StoreError> {
        self.tables().user_mut(id)?.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn edit_profile(
        &self,
        id: UserId,
        fullname: &str,
        username: &str,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables();
        if !username.is_empty()
            && tables
                .users
                .values()
                .any(|u| u.id != id && u.username == username)
        {
            return Err(StoreError::Conflict("username already in use".to_string()));
        }

        let user = tables.user_mut(id)?;
        user.fullname = fullname.to_string();
        user.username = username.to_string();
        Ok(user.clone())
    }

    async fn verify_email(&self, email: &str, token: &str) -> Result<(), StoreError> {
        let mut tables = self.tables();
        tables.user_by_email_mut(email)?.is_email_active = true;
        tables.blacklist_token(token);
        Ok(())
    }

    async fn set_online_status(&self, id: UserId, online: bool) -> Result<(), StoreError> {
        self.tables().user_mut(id)?.online = online;
        debug!("user {id} online={online}");
        Ok(())
    }

    async fn online_user_count(&self) -> Result<i64, StoreError> {
        Ok(self.tables().users.values().filter(|u| u.online).count() as i64)
    }

    async fn total_user_count(&self) -> Result<i64, StoreError> {
        Ok(self.tables().users.len() as i64)
    }

    async fn user_count_in_lga(&self, lga: &str) -> Result<i64, StoreError> {
        let count = self
            .tables()
            .users
            .values()
            .filter(|u| u.lga_name.as_deref() == Some(lga))
            .count();
        Ok(count as i64)
    }

    async fn all_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables().users.values().cloned().collect())
    }

    async fn add_to_blacklist(&self, token: &str) -> Result<Blacklist, StoreError> {
        Ok(self.tables().blacklist_token(token))
    }

    async fn is_token_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let token = normalize_token(token);
        Ok(self.tables().blacklist.iter().any(|b| b.token == token))
    }

    async fn create_user_image(
        &self,
        user_id: UserId,
        thumbnail_url: &str,
    ) -> Result<UserImage, StoreError> {
        let mut tables = self.tables();
        tables.user_mut(user_id)?.thumbnail_url = Some(thumbnail_url.to_string());

        let image = UserImage {
            id: tables.next_id(),
            user_id,
            thumbnail_url: thumbnail_url.to_string(),
            created_at: Utc::now(),
        };
        tables.user_images.push(image.clone());
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            fullname: "Test User".to_string(),
            email: email.to_string(),
            username: username.to_string(),
            hashed_password: "hash".to_string(),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.ng", "a")).await.unwrap();

        let err = store.create_user(new_user("a@x.ng", "b")).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(store.ensure_email_available("a@x.ng").await.is_err());
        assert!(store.ensure_email_available("b@x.ng").await.is_ok());
    }

    #[tokio::test]
    async fn lookups_distinguish_missing_users() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.ng", "ada")).await.unwrap();

        assert_eq!(store.find_by_id(user.id).await.unwrap().email, "a@x.ng");
        assert_eq!(store.find_by_username("ada").await.unwrap().id, user.id);
        assert_eq!(store.find_by_username("a@x.ng").await.unwrap().id, user.id);
        assert!(store.find_by_email("nobody@x.ng").await.unwrap_err().is_not_found());
        assert!(store.find_by_id(user.id + 100).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn mac_registration_is_find_or_create() {
        let store = MemoryStore::new();
        let mac = "aa:bb:cc:dd:ee:ff";

        let first = store
            .create_user_with_mac_address(NewUser::from_mac_address(mac))
            .await
            .unwrap();
        let second = store
            .create_user_with_mac_address(NewUser::from_mac_address(mac))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.total_user_count().await.unwrap(), 1);
        assert_eq!(store.find_by_mac_address(mac).await.unwrap().id, first.id);

        let err = store
            .create_user(NewUser::from_mac_address(mac))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn several_device_only_users_coexist() {
        let store = MemoryStore::new();
        for mac in ["01", "02", "03"] {
            store
                .create_user_with_mac_address(NewUser::from_mac_address(mac))
                .await
                .unwrap();
        }
        assert_eq!(store.total_user_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn presence_flags_drive_online_count() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user("a@x.ng", "a")).await.unwrap();
        let b = store.create_user(new_user("b@x.ng", "b")).await.unwrap();

        store.set_online_status(a.id, true).await.unwrap();
        store.set_online_status(b.id, true).await.unwrap();
        store.set_offline(b.id).await.unwrap();

        assert_eq!(store.online_user_count().await.unwrap(), 1);
        assert!(store.set_offline(999).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn blacklist_ignores_surrounding_whitespace() {
        let store = MemoryStore::new();
        store.add_to_blacklist("  token-1\n").await.unwrap();

        assert!(store.is_token_blacklisted("token-1").await.unwrap());
        assert!(store.is_token_blacklisted(" token-1 ").await.unwrap());
        assert!(!store.is_token_blacklisted("token-2").await.unwrap());
    }

    #[tokio::test]
    async fn verify_email_activates_and_revokes() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.ng", "a")).await.unwrap();

        store.verify_email("a@x.ng", "verify-token").await.unwrap();

        assert!(store.find_by_email("a@x.ng").await.unwrap().is_email_active);
        assert!(store.is_token_blacklisted("verify-token").await.unwrap());
    }

    #[tokio::test]
    async fn empty_identity_never_matches_device_accounts() {
        let store = MemoryStore::new();
        let device = store
            .create_user_with_mac_address(NewUser::from_mac_address("aa:bb"))
            .await
            .unwrap();

        assert!(store.find_by_username("").await.unwrap_err().is_not_found());
        assert!(store.find_by_email("").await.unwrap_err().is_not_found());
        assert!(store.ensure_email_available("").await.is_ok());
        assert!(store.update_password("", "other-hash").await.unwrap_err().is_not_found());
        assert!(store.verify_email("", "t").await.unwrap_err().is_not_found());

        let device = store.find_by_id(device.id).await.unwrap();
        assert_eq!(device.hashed_password, "");
        assert!(!device.is_email_active);
    }

    #[tokio::test]
    async fn lga_counts_only_matching_users() {
        let store = MemoryStore::new();
        let mut ikeja = new_user("a@x.ng", "a");
        ikeja.lga_name = Some("Ikeja".to_string());
        store.create_user(ikeja).await.unwrap();
        store.create_user(new_user("b@x.ng", "b")).await.unwrap();

        assert_eq!(store.user_count_in_lga("Ikeja").await.unwrap(), 1);
        assert_eq!(store.user_count_in_lga("Epe").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn profile_image_becomes_thumbnail() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.ng", "a")).await.unwrap();

        let image = store
            .create_user_image(user.id, "https://cdn/1_me.png")
            .await
            .unwrap();

        assert_eq!(image.user_id, user.id);
        assert_eq!(
            store.find_by_id(user.id).await.unwrap().thumbnail_url.as_deref(),
            Some("https://cdn/1_me.png")
        );
    }

    #[tokio::test]
    async fn password_changes_apply_by_email_and_id() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.ng", "a")).await.unwrap();

        store.update_password("a@x.ng", "h2").await.unwrap();
        assert_eq!(store.find_by_id(user.id).await.unwrap().hashed_password, "h2");

        store.reset_password(user.id, "h3").await.unwrap();
        assert_eq!(store.find_by_id(user.id).await.unwrap().hashed_password, "h3");
    }
}
