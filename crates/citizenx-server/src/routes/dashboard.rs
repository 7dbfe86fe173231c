//! Read-only aggregate endpoints behind `/api/v1/dashboard`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use citizenx_model::{
    CategoryReportCount, CountFilter, DateWindow, Marker, RatingPercentage, ReportCount,
    ReportTypeCounts, StateReportCount, StateReportPercentage, parse_day,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::ApiQuery;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/percentages", get(percentages))
        .route("/states", get(state_counts))
        .route("/states/top", get(top_states))
        .route("/filtered", get(filtered_counts))
        .route("/report-types", get(report_type_counts))
        .route("/today", get(today))
        .route("/markers", get(markers))
        .route("/ratings", get(ratings))
        .route("/lga-counts", get(lga_counts))
        .route("/categories", get(categories))
        .route("/state-names", get(state_names))
        .route("/total", get(total))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Count {
    pub count: i64,
}

/// Comma-separated lists and optional `YYYY-MM-DD` bounds; every part may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub state: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn optional_day(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(Some(parse_day(field, v)?)),
        _ => Ok(None),
    }
}

impl FilterQuery {
    pub fn to_filter(&self) -> Result<CountFilter, ApiError> {
        Ok(CountFilter {
            categories: split_list(self.category.as_deref()),
            states: split_list(self.state.as_deref()),
            start: optional_day("start", self.start.as_deref())?,
            end: optional_day("end", self.end.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportTypeQuery {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub lga: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RatingQuery {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub state: String,
}

async fn percentages(
    State(state): State<AppState>,
) -> Result<Json<Vec<StateReportPercentage>>, ApiError> {
    Ok(Json(state.reports.report_percentage_by_state().await?))
}

async fn state_counts(
    State(state): State<AppState>,
) -> Result<Json<Vec<StateReportCount>>, ApiError> {
    Ok(Json(state.reports.state_report_counts().await?))
}

async fn top_states(
    State(state): State<AppState>,
) -> Result<Json<Vec<StateReportCount>>, ApiError> {
    Ok(Json(state.reports.top_states().await?))
}

async fn filtered_counts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FilterQuery>,
) -> Result<Json<Vec<CategoryReportCount>>, ApiError> {
    let filter = query.to_filter()?;
    Ok(Json(state.reports.filtered_state_report_counts(&filter).await?))
}

async fn report_type_counts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReportTypeQuery>,
) -> Result<Json<ReportTypeCounts>, ApiError> {
    let window = DateWindow::from_optional_days(query.start.as_deref(), query.end.as_deref())?;
    Ok(Json(
        state
            .reports
            .report_type_counts(&query.state, &query.lga, window)
            .await?,
    ))
}

async fn today(State(state): State<AppState>) -> Result<Json<Count>, ApiError> {
    Ok(Json(Count {
        count: state.reports.reports_posted_today().await?,
    }))
}

async fn markers(State(state): State<AppState>) -> Result<Json<Vec<Marker>>, ApiError> {
    Ok(Json(state.reports.incident_markers().await?))
}

async fn ratings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RatingQuery>,
) -> Result<Json<RatingPercentage>, ApiError> {
    Ok(Json(
        state
            .reports
            .rating_percentages(&query.category, &query.state)
            .await?,
    ))
}

async fn lga_counts(State(state): State<AppState>) -> Result<Json<Vec<ReportCount>>, ApiError> {
    Ok(Json(state.reports.report_counts_by_state_and_lga().await?))
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.reports.all_categories().await?))
}

async fn state_names(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.reports.all_states().await?))
}

async fn total(State(state): State<AppState>) -> Result<Json<Count>, ApiError> {
    Ok(Json(Count {
        count: state.reports.total_report_count().await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FilterQuery::default().to_filter().unwrap();
        assert_eq!(filter, CountFilter::default());
    }

    #[test]
    fn lists_are_comma_separated() {
        let query = FilterQuery {
            category: Some("Flood, Fire,,".to_string()),
            state: Some("Lagos".to_string()),
            start: Some("2024-01-01".to_string()),
            end: None,
        };
        let filter = query.to_filter().unwrap();

        assert_eq!(filter.categories, vec!["Flood", "Fire"]);
        assert_eq!(filter.states, vec!["Lagos"]);
        assert!(filter.start.is_some());
        assert!(filter.end.is_none());
    }

    #[test]
    fn malformed_day_is_rejected() {
        let query = FilterQuery {
            end: Some("01/02/2024".to_string()),
            ..FilterQuery::default()
        };
        assert!(matches!(query.to_filter(), Err(ApiError::BadRequest(_))));
    }
}
