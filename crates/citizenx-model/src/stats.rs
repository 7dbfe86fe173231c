//! Shapes returned by the read-side dashboard queries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StateReportPercentage {
    pub state_name: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StateReportCount {
    pub state_name: String,
    pub report_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CategoryReportCount {
    pub state_name: String,
    pub category: String,
    pub report_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReportCount {
    pub state_name: String,
    pub lga_name: String,
    pub count: i64,
}

/// Map pin for one reported location, carrying the report count of its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub popup: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingPercentage {
    pub good_percentage: f64,
    pub bad_percentage: f64,
}

impl RatingPercentage {
    /// Percentages of `good` and `bad` out of `total`. With no reports both are zero.
    pub fn from_counts(good: i64, bad: i64, total: i64) -> Self {
        if total == 0 {
            return RatingPercentage {
                good_percentage: 0.0,
                bad_percentage: 0.0,
            };
        }

        let total = total as f64;
        RatingPercentage {
            good_percentage: good as f64 / total * 100.0,
            bad_percentage: bad as f64 / total * 100.0,
        }
    }
}

/// Per-category breakdown for one state/LGA pair.
///
/// `report_types[i]` pairs with `counts[i]`. `top_states` ranks every state by its
/// reports in the same LGA name, most first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTypeCounts {
    pub report_types: Vec<String>,
    pub counts: Vec<i64>,
    pub total_users: i64,
    pub total_reports: i64,
    pub top_states: Vec<StateReportCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_percentages_of_nothing_are_zero() {
        let pct = RatingPercentage::from_counts(0, 0, 0);
        assert_eq!(pct.good_percentage, 0.0);
        assert_eq!(pct.bad_percentage, 0.0);
    }

    #[test]
    fn rating_percentages_ignore_unrated_reports() {
        let pct = RatingPercentage::from_counts(1, 2, 4);
        assert_eq!(pct.good_percentage, 25.0);
        assert_eq!(pct.bad_percentage, 50.0);
    }
}
