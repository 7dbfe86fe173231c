//! Administrative-region records written alongside each categorised submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Local Government Area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Lga {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct State {
    pub id: Uuid,
    pub name: String,
}

/// One categorised submission; the source rows for most dashboard counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReportType {
    pub id: Uuid,
    pub user_id: UserId,
    pub category: String,
    pub state_name: String,
    pub lga_name: String,
    pub incident_report_rating: Option<String>,
    pub date_of_incidence: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SubReport {
    pub id: Uuid,
    pub report_type_id: Uuid,
    pub lga_id: Uuid,
    pub state_name: String,
    pub report_type_category: String,
    pub sub_report_type: String,
}
