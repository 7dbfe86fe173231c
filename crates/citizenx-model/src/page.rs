//! Pagination and filtering inputs for the listing and counting queries.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Rows per page for every paginated listing.
pub const PAGE_SIZE: i64 = 20;

/// One-based page number. Values below one are treated as the first page; there is no
/// upper bound, a page past the end simply has no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page(u32);

impl Page {
    pub const FIRST: Page = Page(1);

    pub fn new(number: u32) -> Self {
        Page(number.max(1))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.0) - 1) * PAGE_SIZE
    }

    /// The slice of `items` (already in listing order) that falls on this page.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset() as usize)
            .take(self.limit() as usize)
            .cloned()
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::FIRST
    }
}

/// Closed time interval, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateWindow { start, end }
    }

    /// Builds a window from two `YYYY-MM-DD` days. Each bound is midnight UTC of its
    /// day, so the end day itself is only matched at exactly 00:00.
    pub fn from_days(start: &str, end: &str) -> Result<Self, ModelError> {
        Ok(DateWindow {
            start: parse_day("start", start)?,
            end: parse_day("end", end)?,
        })
    }

    /// Optional variant for query strings: a window exists only when both days are
    /// present and non-empty.
    pub fn from_optional_days(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<Self>, ModelError> {
        match (start, end) {
            (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => {
                Self::from_days(s, e).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

pub fn parse_day(field: &'static str, value: &str) -> Result<DateTime<Utc>, ModelError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ModelError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

/// Filters for per-state, per-category counts. Empty lists match everything; either
/// bound of the date range may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountFilter {
    pub categories: Vec<String>,
    pub states: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl CountFilter {
    pub fn matches(&self, category: &str, state: &str, when: &DateTime<Utc>) -> bool {
        (self.categories.is_empty() || self.categories.iter().any(|c| c == category))
            && (self.states.is_empty() || self.states.iter().any(|s| s == state))
            && self.start.is_none_or(|start| *when >= start)
            && self.end.is_none_or(|end| *when <= end)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn page_offsets_step_by_page_size() {
        assert_eq!(Page::new(1).offset(), 0);
        assert_eq!(Page::new(2).offset(), 20);
        assert_eq!(Page::new(5).offset(), 80);
        assert_eq!(Page::new(3).limit(), PAGE_SIZE);
    }

    #[test]
    fn page_zero_is_the_first_page() {
        assert_eq!(Page::new(0), Page::FIRST);
        assert_eq!(Page::default(), Page::FIRST);
    }

    #[test]
    fn slicing_past_the_end_is_empty() {
        let items: Vec<u32> = (0..25).collect();
        assert_eq!(Page::new(2).slice(&items), (20..25).collect::<Vec<_>>());
        assert!(Page::new(3).slice(&items).is_empty());
    }

    #[test]
    fn day_window_bounds_are_midnight_utc() {
        let window = DateWindow::from_days("2024-03-01", "2024-03-31").unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
        assert!(window.contains(&Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()));
        assert!(!window.contains(&Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 1).unwrap()));
    }

    #[test]
    fn malformed_day_names_the_offending_bound() {
        let err = DateWindow::from_days("2024-03-01", "31/03/2024").unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidDate {
                field: "end",
                value: "31/03/2024".to_string()
            }
        );
    }

    #[test]
    fn window_needs_both_days() {
        assert_eq!(DateWindow::from_optional_days(Some("2024-01-01"), None), Ok(None));
        assert_eq!(DateWindow::from_optional_days(Some(""), Some("")), Ok(None));
        assert!(
            DateWindow::from_optional_days(Some("2024-01-01"), Some("2024-02-01"))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn empty_count_filter_matches_everything() {
        let now = Utc::now();
        assert!(CountFilter::default().matches("flood", "Lagos", &now));
    }

    #[test]
    fn count_filter_honours_open_ended_ranges() {
        let cutoff = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let filter = CountFilter {
            categories: vec!["flood".to_string()],
            start: Some(cutoff),
            ..CountFilter::default()
        };

        assert!(filter.matches("flood", "Oyo", &cutoff));
        assert!(!filter.matches("fire", "Oyo", &cutoff));
        assert!(!filter.matches("flood", "Oyo", &(cutoff - chrono::Duration::days(1))));
    }
}
