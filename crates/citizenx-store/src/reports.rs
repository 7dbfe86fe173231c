use async_trait::async_trait;
use citizenx_model::{
    BookmarkReport, CategoryReportCount, CountFilter, DateWindow, IncidentReport, Lga, Marker,
    NewReward, Page, RatingPercentage, ReportCount, ReportType, ReportTypeCounts, Reward, State,
    StateReportCount, StateReportPercentage, SubReport, UserId,
};
use uuid::Uuid;

use crate::StoreError;

/// Number of states returned by [`IncidentReportRepository::top_states`].
pub const TOP_STATES_LIMIT: i64 = 6;

/// Incident reports, their region/category bookkeeping, rewards and bookmarks.
///
/// Paginated listings are ordered by incident time, newest first, and return an empty
/// list for pages past the end.
#[async_trait]
pub trait IncidentReportRepository: Send + Sync {
    async fn create_report(&self, report: IncidentReport) -> Result<IncidentReport, StoreError>;

    async fn find_report_by_id(&self, id: Uuid) -> Result<IncidentReport, StoreError>;

    async fn report_status(&self, id: Uuid) -> Result<String, StoreError>;

    /// Overwrites every column of an existing report.
    async fn update_report(&self, report: IncidentReport) -> Result<IncidentReport, StoreError>;

    async fn list_reports(&self, page: Page) -> Result<Vec<IncidentReport>, StoreError>;

    async fn list_reports_by_state(
        &self,
        state: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError>;

    async fn list_reports_by_state_in_window(
        &self,
        state: &str,
        window: DateWindow,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError>;

    async fn list_reports_by_lga(
        &self,
        lga: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError>;

    async fn list_reports_by_category(
        &self,
        category: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError>;

    async fn report_percentage_by_state(&self) -> Result<Vec<StateReportPercentage>, StoreError>;

    async fn state_report_counts(&self) -> Result<Vec<StateReportCount>, StoreError>;

    /// Counts grouped by state and category. Rows with an empty state are skipped.
    async fn filtered_state_report_counts(
        &self,
        filter: &CountFilter,
    ) -> Result<Vec<CategoryReportCount>, StoreError>;

    async fn report_type_counts(
        &self,
        state: &str,
        lga: &str,
        window: Option<DateWindow>,
    ) -> Result<ReportTypeCounts, StoreError>;

    /// Reports whose incident time falls on or after 00:00 UTC today.
    async fn reports_posted_today(&self) -> Result<i64, StoreError>;

    async fn sub_reports_by_type_and_lga(
        &self,
        category: &str,
        lga: &str,
    ) -> Result<Vec<SubReport>, StoreError>;

    async fn incident_markers(&self) -> Result<Vec<Marker>, StoreError>;

    async fn all_categories(&self) -> Result<Vec<String>, StoreError>;

    async fn all_states(&self) -> Result<Vec<String>, StoreError>;

    async fn rating_percentages(
        &self,
        category: &str,
        state: &str,
    ) -> Result<RatingPercentage, StoreError>;

    async fn report_counts_by_state_and_lga(&self) -> Result<Vec<ReportCount>, StoreError>;

    /// The [`TOP_STATES_LIMIT`] states with the most reports, most first.
    async fn top_states(&self) -> Result<Vec<StateReportCount>, StoreError>;

    async fn total_report_count(&self) -> Result<i64, StoreError>;

    async fn sub_report_names(
        &self,
        state: &str,
        lga_id: Uuid,
        category: &str,
    ) -> Result<Vec<String>, StoreError>;

    /// Find-or-create by user id, then overwrite. See [`Reward::overwrite_with`].
    async fn update_reward(&self, reward: NewReward) -> Result<Reward, StoreError>;

    async fn find_reward(&self, user_id: UserId) -> Result<Reward, StoreError>;

    /// Whether the user holds a reward with a positive balance.
    async fn has_previous_reports(&self, user_id: UserId) -> Result<bool, StoreError>;

    async fn is_bookmarked(&self, user_id: UserId, report_id: Uuid) -> Result<bool, StoreError>;

    /// Saves inside a transaction; an existing bookmark is a [`StoreError::Conflict`].
    async fn save_bookmark(&self, bookmark: BookmarkReport) -> Result<(), StoreError>;

    /// Writes all four records in one transaction. Any failure leaves none of them.
    async fn save_region_report(
        &self,
        lga: Lga,
        state: State,
        report_type: ReportType,
        sub_report: SubReport,
    ) -> Result<(), StoreError>;

    async fn delete_sub_report(&self, id: Uuid) -> Result<(), StoreError>;
}
