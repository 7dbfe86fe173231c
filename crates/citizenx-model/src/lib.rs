//! Records stored by the CitizenX service and the shapes returned by its dashboard
//! aggregations.
//!
//! Everything here is plain data. Persistence lives in `citizenx-store`; the optional
//! `sqlx` feature derives row mappings so the Postgres repositories can decode these
//! types directly.

#![forbid(unsafe_code)]

pub mod page;
pub mod post;
pub mod region;
pub mod report;
pub mod stats;
pub mod user;

pub use crate::page::{CountFilter, DateWindow, PAGE_SIZE, Page, parse_day};
pub use crate::post::{NewPost, Post};
pub use crate::region::{Lga, ReportType, State, SubReport};
pub use crate::report::{BookmarkReport, IncidentReport, NewReward, Reward};
pub use crate::stats::{
    CategoryReportCount, Marker, RatingPercentage, ReportCount, ReportTypeCounts,
    StateReportCount, StateReportPercentage,
};
pub use crate::user::{Blacklist, NewUser, User, UserId, UserImage};

/// Errors raised while turning caller input into model values.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("failed to parse {field} date '{value}': expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
}
