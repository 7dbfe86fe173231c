use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Users are keyed by a database-assigned integer.
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: UserId,
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub telephone: Option<String>,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub online: bool,
    pub is_email_active: bool,
    pub mac_address: Option<String>,
    pub lga_name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering a user. Email and username may be empty for
/// device-only accounts created from a MAC address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub telephone: Option<String>,
    pub hashed_password: String,
    pub mac_address: Option<String>,
    pub lga_name: Option<String>,
}

impl NewUser {
    /// A device-only registration carrying nothing but the MAC address.
    pub fn from_mac_address(mac_address: impl Into<String>) -> Self {
        NewUser {
            mac_address: Some(mac_address.into()),
            ..NewUser::default()
        }
    }

    pub fn into_user(self, id: UserId, created_at: DateTime<Utc>) -> User {
        User {
            id,
            fullname: self.fullname,
            email: self.email,
            username: self.username,
            telephone: self.telephone,
            hashed_password: self.hashed_password,
            online: false,
            is_email_active: false,
            mac_address: self.mac_address,
            lga_name: self.lga_name,
            thumbnail_url: None,
            created_at,
        }
    }
}

/// A revoked bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Blacklist {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserImage {
    pub id: i64,
    pub user_id: UserId,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
}
