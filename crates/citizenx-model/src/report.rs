use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// A citizen's report of an incident at a place and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct IncidentReport {
    pub id: Uuid,
    pub user_id: UserId,
    pub state_name: String,
    pub lga_name: String,
    pub category: String,
    pub description: String,
    pub image_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<String>,
    pub status: String,
    pub incident_at: DateTime<Utc>,
}

impl IncidentReport {
    pub const STATUS_PENDING: &'static str = "pending";
}

/// Point/balance ledger entry, at most one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reward {
    pub id: i64,
    pub user_id: UserId,
    pub reward_type: String,
    pub point: i64,
    pub balance: i64,
    pub incident_report_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReward {
    pub user_id: UserId,
    pub reward_type: String,
    pub point: i64,
    pub balance: i64,
    pub incident_report_id: Option<Uuid>,
}

impl NewReward {
    pub fn into_reward(self, id: i64) -> Reward {
        Reward {
            id,
            user_id: self.user_id,
            reward_type: self.reward_type,
            point: self.point,
            balance: self.balance,
            incident_report_id: self.incident_report_id,
        }
    }
}

impl Reward {
    /// Applies a later reward to this one. Type, point and report link are replaced;
    /// the balance is replaced only by a non-zero value. Balances never accumulate.
    pub fn overwrite_with(&mut self, update: &NewReward) {
        self.reward_type = update.reward_type.clone();
        self.point = update.point;
        self.incident_report_id = update.incident_report_id;
        if update.balance != 0 {
            self.balance = update.balance;
        }
    }
}

/// A user's saved reference to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BookmarkReport {
    pub user_id: UserId,
    pub report_id: Uuid,
}
