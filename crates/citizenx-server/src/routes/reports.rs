use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use citizenx_model::{BookmarkReport, DateWindow, IncidentReport};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::{ApiPath, ApiQuery, PageQuery};

#[derive(Debug, Default, Deserialize)]
pub struct StateReportsQuery {
    pub page: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportStatus {
    pub id: Uuid,
    pub status: String,
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ApiError::bad_request(format!("invalid {field} time '{value}': {e}")))
}

impl StateReportsQuery {
    /// The requested window, present only when both bounds are given.
    fn window(&self) -> Result<Option<DateWindow>, ApiError> {
        match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => Ok(Some(
                DateWindow::new(parse_instant("start", start)?, parse_instant("end", end)?),
            )),
            _ => Ok(None),
        }
    }
}

pub async fn list_reports(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Vec<IncidentReport>>, ApiError> {
    Ok(Json(state.reports.list_reports(query.page()).await?))
}

pub async fn reports_by_state(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<StateReportsQuery>,
) -> Result<Json<Vec<IncidentReport>>, ApiError> {
    let page = PageQuery { page: query.page }.page();

    let reports = match query.window()? {
        Some(window) => {
            debug!("reports for {name} between {} and {}", window.start, window.end);
            state
                .reports
                .list_reports_by_state_in_window(&name, window, page)
                .await?
        }
        None => state.reports.list_reports_by_state(&name, page).await?,
    };
    Ok(Json(reports))
}

pub async fn reports_by_lga(
    State(state): State<AppState>,
    ApiPath(lga): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Vec<IncidentReport>>, ApiError> {
    Ok(Json(
        state.reports.list_reports_by_lga(&lga, query.page()).await?,
    ))
}

pub async fn reports_by_category(
    State(state): State<AppState>,
    ApiPath(category): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Vec<IncidentReport>>, ApiError> {
    Ok(Json(
        state
            .reports
            .list_reports_by_category(&category, query.page())
            .await?,
    ))
}

pub async fn get_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<IncidentReport>, ApiError> {
    Ok(Json(state.reports.find_report_by_id(id).await?))
}

pub async fn report_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ReportStatus>, ApiError> {
    let status = state.reports.report_status(id).await?;
    Ok(Json(ReportStatus { id, status }))
}

/// `POST /api/v1/reports/{id}/bookmark`: saves an existing report for the caller, once.
pub async fn bookmark_report(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(report_id): ApiPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.reports.find_report_by_id(report_id).await?;

    if state.reports.is_bookmarked(user.id, report_id).await? {
        return Err(ApiError::Conflict("Report already bookmarked".to_string()));
    }

    state
        .reports
        .save_bookmark(BookmarkReport {
            user_id: user.id,
            report_id,
        })
        .await?;

    Ok(Json(json!({ "message": "Report bookmarked successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_needs_both_bounds() {
        let query = StateReportsQuery {
            start: Some("2024-03-01T00:00:00Z".to_string()),
            ..StateReportsQuery::default()
        };
        assert_eq!(query.window().unwrap(), None);
    }

    #[test]
    fn window_parses_rfc3339() {
        let query = StateReportsQuery {
            page: None,
            start: Some("2024-03-01T00:00:00Z".to_string()),
            end: Some("2024-03-02T12:00:00+01:00".to_string()),
        };
        let window = query.window().unwrap().unwrap();
        assert_eq!(window.end.to_rfc3339(), "2024-03-02T11:00:00+00:00");
    }

    #[test]
    fn bad_window_is_a_client_error() {
        let query = StateReportsQuery {
            page: None,
            start: Some("yesterday".to_string()),
            end: Some("today".to_string()),
        };
        assert!(matches!(query.window(), Err(ApiError::BadRequest(_))));
    }
}
