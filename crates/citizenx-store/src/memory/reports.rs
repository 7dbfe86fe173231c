use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use citizenx_model::{
    BookmarkReport, CategoryReportCount, CountFilter, DateWindow, IncidentReport, Lga, Marker,
    NewReward, Page, RatingPercentage, ReportCount, ReportType, ReportTypeCounts, Reward, State,
    StateReportCount, StateReportPercentage, SubReport, UserId,
};
use tracing::debug;
use uuid::Uuid;

use super::{MemoryStore, Tables};
use crate::StoreError;
use crate::reports::{IncidentReportRepository, TOP_STATES_LIMIT};

impl Tables {
    /// Reports matching `pred`, newest incident first, cut to `page`.
    fn page_of_reports(
        &self,
        page: Page,
        pred: impl Fn(&IncidentReport) -> bool,
    ) -> Vec<IncidentReport> {
        let mut matching: Vec<&IncidentReport> = self.reports.values().filter(|r| pred(r)).collect();
        matching.sort_by(|a, b| b.incident_at.cmp(&a.incident_at).then(a.id.cmp(&b.id)));

        page.slice(&matching).into_iter().cloned().collect()
    }

    fn count_report_types_by<K: Ord>(
        &self,
        pred: impl Fn(&ReportType) -> bool,
        key: impl Fn(&ReportType) -> K,
    ) -> BTreeMap<K, i64> {
        let mut counts = BTreeMap::new();
        for rt in self.report_types.values().filter(|rt| pred(rt)) {
            *counts.entry(key(rt)).or_insert(0) += 1;
        }
        counts
    }
}

/// Most reports first; ties broken by state name.
fn ranked(counts: BTreeMap<String, i64>) -> Vec<StateReportCount> {
    let mut ranked: Vec<StateReportCount> = counts
        .into_iter()
        .map(|(state_name, report_count)| StateReportCount {
            state_name,
            report_count,
        })
        .collect();
    ranked.sort_by(|a, b| b.report_count.cmp(&a.report_count));
    ranked
}

#[async_trait]
impl IncidentReportRepository for MemoryStore {
    async fn create_report(&self, report: IncidentReport) -> Result<IncidentReport, StoreError> {
        let mut tables = self.tables();
        if tables.reports.contains_key(&report.id) {
            return Err(StoreError::Conflict(format!(
                "report {} already exists",
                report.id
            )));
        }
        tables.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn find_report_by_id(&self, id: Uuid) -> Result<IncidentReport, StoreError> {
        self.tables()
            .reports
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("report"))
    }

    async fn report_status(&self, id: Uuid) -> Result<String, StoreError> {
        self.find_report_by_id(id).await.map(|r| r.status)
    }

    async fn update_report(&self, report: IncidentReport) -> Result<IncidentReport, StoreError> {
        let mut tables = self.tables();
        let stored = tables
            .reports
            .get_mut(&report.id)
            .ok_or(StoreError::NotFound("report"))?;
        *stored = report.clone();
        Ok(report)
    }

    async fn list_reports(&self, page: Page) -> Result<Vec<IncidentReport>, StoreError> {
        Ok(self.tables().page_of_reports(page, |_| true))
    }

    async fn list_reports_by_state(
        &self,
        state: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        Ok(self.tables().page_of_reports(page, |r| r.state_name == state))
    }

    async fn list_reports_by_state_in_window(
        &self,
        state: &str,
        window: DateWindow,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        Ok(self.tables().page_of_reports(page, |r| {
            r.state_name == state && window.contains(&r.incident_at)
        }))
    }

    async fn list_reports_by_lga(
        &self,
        lga: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        Ok(self.tables().page_of_reports(page, |r| r.lga_name == lga))
    }

    async fn list_reports_by_category(
        &self,
        category: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        Ok(self.tables().page_of_reports(page, |r| r.category == category))
    }

    async fn report_percentage_by_state(&self) -> Result<Vec<StateReportPercentage>, StoreError> {
        let tables = self.tables();
        let total = tables.reports.len() as f64;

        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for report in tables.reports.values() {
            *counts.entry(report.state_name.as_str()).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(state_name, count)| StateReportPercentage {
                state_name: state_name.to_string(),
                count,
                percentage: count as f64 * 100.0 / total,
            })
            .collect())
    }

    async fn state_report_counts(&self) -> Result<Vec<StateReportCount>, StoreError> {
        let counts = self
            .tables()
            .count_report_types_by(|_| true, |rt| rt.state_name.clone());

        Ok(counts
            .into_iter()
            .map(|(state_name, report_count)| StateReportCount {
                state_name,
                report_count,
            })
            .collect())
    }

    async fn filtered_state_report_counts(
        &self,
        filter: &CountFilter,
    ) -> Result<Vec<CategoryReportCount>, StoreError> {
        let counts = self.tables().count_report_types_by(
            |rt| {
                !rt.state_name.is_empty()
                    && filter.matches(&rt.category, &rt.state_name, &rt.date_of_incidence)
            },
            |rt| (rt.state_name.clone(), rt.category.clone()),
        );

        Ok(counts
            .into_iter()
            .map(|((state_name, category), report_count)| CategoryReportCount {
                state_name,
                category,
                report_count,
            })
            .collect())
    }

    async fn report_type_counts(
        &self,
        state: &str,
        lga: &str,
        window: Option<DateWindow>,
    ) -> Result<ReportTypeCounts, StoreError> {
        let tables = self.tables();
        let in_window = |rt: &ReportType| window.is_none_or(|w| w.contains(&rt.date_of_incidence));
        let in_place = |rt: &ReportType| rt.state_name == state && rt.lga_name == lga;

        let by_category =
            tables.count_report_types_by(|rt| in_place(rt) && in_window(rt), |rt| rt.category.clone());

        let users: BTreeSet<UserId> = tables
            .report_types
            .values()
            .filter(|rt| in_place(rt))
            .map(|rt| rt.user_id)
            .collect();
        let total_reports = tables.report_types.values().filter(|rt| in_place(rt)).count();

        let by_state = tables.count_report_types_by(
            |rt| rt.lga_name == lga && in_window(rt),
            |rt| rt.state_name.clone(),
        );

        let (report_types, counts) = by_category.into_iter().unzip();
        Ok(ReportTypeCounts {
            report_types,
            counts,
            total_users: users.len() as i64,
            total_reports: total_reports as i64,
            top_states: ranked(by_state),
        })
    }

    async fn reports_posted_today(&self) -> Result<i64, StoreError> {
        let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let count = self
            .tables()
            .reports
            .values()
            .filter(|r| r.incident_at >= midnight)
            .count();
        Ok(count as i64)
    }

    async fn sub_reports_by_type_and_lga(
        &self,
        category: &str,
        lga: &str,
    ) -> Result<Vec<SubReport>, StoreError> {
        let tables = self.tables();
        let mut found: Vec<SubReport> = tables
            .sub_reports
            .values()
            .filter(|sr| {
                tables
                    .report_types
                    .get(&sr.report_type_id)
                    .is_some_and(|rt| rt.category == category)
                    && tables.lgas.get(&sr.lga_id).is_some_and(|l| l.name == lga)
            })
            .cloned()
            .collect();
        found.sort_by_key(|sr| sr.id);
        Ok(found)
    }

    async fn incident_markers(&self) -> Result<Vec<Marker>, StoreError> {
        let tables = self.tables();

        let mut per_state: HashMap<&str, i64> = HashMap::new();
        for report in tables.reports.values() {
            *per_state.entry(report.state_name.as_str()).or_insert(0) += 1;
        }

        let mut markers: Vec<Marker> = Vec::new();
        for report in tables.reports.values() {
            let duplicate = markers.iter().any(|m| {
                m.popup == report.state_name && m.lat == report.latitude && m.lng == report.longitude
            });
            if !duplicate {
                markers.push(Marker {
                    lat: report.latitude,
                    lng: report.longitude,
                    popup: report.state_name.clone(),
                    count: per_state[report.state_name.as_str()],
                });
            }
        }

        markers.sort_by(|a, b| {
            a.popup
                .cmp(&b.popup)
                .then(a.lat.total_cmp(&b.lat))
                .then(a.lng.total_cmp(&b.lng))
        });
        Ok(markers)
    }

    async fn all_categories(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables();
        let distinct: BTreeSet<&String> = tables.report_types.values().map(|rt| &rt.category).collect();
        Ok(distinct.into_iter().cloned().collect())
    }

    async fn all_states(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables();
        let distinct: BTreeSet<&String> =
            tables.report_types.values().map(|rt| &rt.state_name).collect();
        Ok(distinct.into_iter().cloned().collect())
    }

    async fn rating_percentages(
        &self,
        category: &str,
        state: &str,
    ) -> Result<RatingPercentage, StoreError> {
        let tables = self.tables();
        let ratings: Vec<Option<&str>> = tables
            .report_types
            .values()
            .filter(|rt| rt.category == category && rt.state_name == state)
            .map(|rt| rt.incident_report_rating.as_deref())
            .collect();

        let good = ratings.iter().filter(|r| **r == Some("good")).count();
        let bad = ratings.iter().filter(|r| **r == Some("bad")).count();
        Ok(RatingPercentage::from_counts(
            good as i64,
            bad as i64,
            ratings.len() as i64,
        ))
    }

    async fn report_counts_by_state_and_lga(&self) -> Result<Vec<ReportCount>, StoreError> {
        let counts = self.tables().count_report_types_by(
            |_| true,
            |rt| (rt.state_name.clone(), rt.lga_name.clone()),
        );

        Ok(counts
            .into_iter()
            .map(|((state_name, lga_name), count)| ReportCount {
                state_name,
                lga_name,
                count,
            })
            .collect())
    }

    async fn top_states(&self) -> Result<Vec<StateReportCount>, StoreError> {
        let counts = self
            .tables()
            .count_report_types_by(|_| true, |rt| rt.state_name.clone());

        let mut top = ranked(counts);
        top.truncate(TOP_STATES_LIMIT as usize);
        Ok(top)
    }

    async fn total_report_count(&self) -> Result<i64, StoreError> {
        Ok(self.tables().report_types.len() as i64)
    }

    async fn sub_report_names(
        &self,
        state: &str,
        lga_id: Uuid,
        category: &str,
    ) -> Result<Vec<String>, StoreError> {
        let tables = self.tables();
        let mut matching: Vec<&SubReport> = tables
            .sub_reports
            .values()
            .filter(|sr| {
                sr.state_name == state && sr.lga_id == lga_id && sr.report_type_category == category
            })
            .collect();
        matching.sort_by_key(|sr| sr.id);
        Ok(matching.into_iter().map(|sr| sr.sub_report_type.clone()).collect())
    }

    async fn update_reward(&self, reward: NewReward) -> Result<Reward, StoreError> {
        let mut tables = self.tables();

        if let Some(existing) = tables.rewards.iter_mut().find(|r| r.user_id == reward.user_id) {
            existing.overwrite_with(&reward);
            return Ok(existing.clone());
        }

        debug!("first reward for user {}", reward.user_id);
        let created = reward.into_reward(tables.next_id());
        tables.rewards.push(created.clone());
        Ok(created)
    }

    async fn find_reward(&self, user_id: UserId) -> Result<Reward, StoreError> {
        self.tables()
            .rewards
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound("reward"))
    }

    async fn has_previous_reports(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self
            .tables()
            .rewards
            .iter()
            .any(|r| r.user_id == user_id && r.balance > 0))
    }

    async fn is_bookmarked(&self, user_id: UserId, report_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .tables()
            .bookmarks
            .contains(&BookmarkReport { user_id, report_id }))
    }

    async fn save_bookmark(&self, bookmark: BookmarkReport) -> Result<(), StoreError> {
        if !self.tables().bookmarks.insert(bookmark) {
            return Err(StoreError::Conflict(format!(
                "report {} already bookmarked by user {}",
                bookmark.report_id, bookmark.user_id
            )));
        }
        debug!("bookmark saved: {bookmark:?}");
        Ok(())
    }

    async fn save_region_report(
        &self,
        lga: Lga,
        state: State,
        report_type: ReportType,
        sub_report: SubReport,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables();

        // Every key is checked before anything is written so a clash leaves no partial rows.
        let clash = if tables.lgas.contains_key(&lga.id) {
            Some(("lga", lga.id))
        } else if tables.states.contains_key(&state.id) {
            Some(("state", state.id))
        } else if tables.report_types.contains_key(&report_type.id) {
            Some(("report type", report_type.id))
        } else if tables.sub_reports.contains_key(&sub_report.id) {
            Some(("sub report", sub_report.id))
        } else {
            None
        };
        if let Some((what, id)) = clash {
            return Err(StoreError::Conflict(format!("{what} {id} already exists")));
        }

        if sub_report.lga_id != lga.id && !tables.lgas.contains_key(&sub_report.lga_id) {
            return Err(StoreError::InvalidInput(format!(
                "sub report references unknown lga {}",
                sub_report.lga_id
            )));
        }
        if sub_report.report_type_id != report_type.id
            && !tables.report_types.contains_key(&sub_report.report_type_id)
        {
            return Err(StoreError::InvalidInput(format!(
                "sub report references unknown report type {}",
                sub_report.report_type_id
            )));
        }

        tables.lgas.insert(lga.id, lga);
        tables.states.insert(state.id, state);
        tables.report_types.insert(report_type.id, report_type);
        tables.sub_reports.insert(sub_report.id, sub_report);
        Ok(())
    }

    async fn delete_sub_report(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables()
            .sub_reports
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("sub report"))
    }
}
