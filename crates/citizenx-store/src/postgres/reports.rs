use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use citizenx_model::{
    BookmarkReport, CategoryReportCount, CountFilter, DateWindow, IncidentReport, Lga, Marker,
    NewReward, Page, RatingPercentage, ReportCount, ReportType, ReportTypeCounts, Reward, State,
    StateReportCount, StateReportPercentage, SubReport, UserId,
};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{PgStore, require_row};
use crate::StoreError;
use crate::reports::{IncidentReportRepository, TOP_STATES_LIMIT};

/// Optional bounds on `date_of_incidence`, bound at placeholders `$first` and `$first+1`.
fn window_clause(first: usize) -> String {
    let second = first + 1;
    format!(
        "(${first}::timestamptz IS NULL OR date_of_incidence >= ${first}) \
         AND (${second}::timestamptz IS NULL OR date_of_incidence <= ${second})"
    )
}

fn window_bounds(window: Option<DateWindow>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match window {
        Some(w) => (Some(w.start), Some(w.end)),
        None => (None, None),
    }
}

impl PgStore {
    /// Runs `query` (a `SELECT * FROM incident_reports WHERE ...` prefix) for one page.
    async fn report_page(
        &self,
        mut query: QueryBuilder<'_, Postgres>,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        query
            .push(" ORDER BY incident_at DESC, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        Ok(query
            .build_query_as::<IncidentReport>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn reports_where(
        &self,
        column: &str,
        value: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        let mut query = QueryBuilder::new(format!("SELECT * FROM incident_reports WHERE {column} = "));
        query.push_bind(value);
        self.report_page(query, page).await
    }
}

#[async_trait]
impl IncidentReportRepository for PgStore {
    async fn create_report(&self, report: IncidentReport) -> Result<IncidentReport, StoreError> {
        Ok(sqlx::query_as::<_, IncidentReport>(
            "INSERT INTO incident_reports \
             (id, user_id, state_name, lga_name, category, description, image_url, \
              latitude, longitude, rating, status, incident_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(report.id)
        .bind(report.user_id)
        .bind(&report.state_name)
        .bind(&report.lga_name)
        .bind(&report.category)
        .bind(&report.description)
        .bind(&report.image_url)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(&report.rating)
        .bind(&report.status)
        .bind(report.incident_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_report_by_id(&self, id: Uuid) -> Result<IncidentReport, StoreError> {
        sqlx::query_as::<_, IncidentReport>("SELECT * FROM incident_reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("report"))
    }

    async fn report_status(&self, id: Uuid) -> Result<String, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT status FROM incident_reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("report"))
    }

    async fn update_report(&self, report: IncidentReport) -> Result<IncidentReport, StoreError> {
        sqlx::query_as::<_, IncidentReport>(
            "UPDATE incident_reports SET \
             user_id = $2, state_name = $3, lga_name = $4, category = $5, description = $6, \
             image_url = $7, latitude = $8, longitude = $9, rating = $10, status = $11, \
             incident_at = $12 \
             WHERE id = $1 RETURNING *",
        )
        .bind(report.id)
        .bind(report.user_id)
        .bind(&report.state_name)
        .bind(&report.lga_name)
        .bind(&report.category)
        .bind(&report.description)
        .bind(&report.image_url)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(&report.rating)
        .bind(&report.status)
        .bind(report.incident_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("report"))
    }

    async fn list_reports(&self, page: Page) -> Result<Vec<IncidentReport>, StoreError> {
        let query = QueryBuilder::new("SELECT * FROM incident_reports WHERE TRUE");
        self.report_page(query, page).await
    }

    async fn list_reports_by_state(
        &self,
        state: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        self.reports_where("state_name", state, page).await
    }

    async fn list_reports_by_state_in_window(
        &self,
        state: &str,
        window: DateWindow,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        let mut query = QueryBuilder::new("SELECT * FROM incident_reports WHERE state_name = ");
        query
            .push_bind(state)
            .push(" AND incident_at BETWEEN ")
            .push_bind(window.start)
            .push(" AND ")
            .push_bind(window.end);
        self.report_page(query, page).await
    }

    async fn list_reports_by_lga(
        &self,
        lga: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        self.reports_where("lga_name", lga, page).await
    }

    async fn list_reports_by_category(
        &self,
        category: &str,
        page: Page,
    ) -> Result<Vec<IncidentReport>, StoreError> {
        self.reports_where("category", category, page).await
    }

    async fn report_percentage_by_state(&self) -> Result<Vec<StateReportPercentage>, StoreError> {
        Ok(sqlx::query_as::<_, StateReportPercentage>(
            "SELECT state_name, COUNT(*) AS count, \
             COUNT(*)::float8 * 100.0::float8 / (SELECT COUNT(*) FROM incident_reports) AS percentage \
             FROM incident_reports GROUP BY state_name ORDER BY state_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn state_report_counts(&self) -> Result<Vec<StateReportCount>, StoreError> {
        Ok(sqlx::query_as::<_, StateReportCount>(
            "SELECT state_name, COUNT(*) AS report_count \
             FROM report_types GROUP BY state_name ORDER BY state_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn filtered_state_report_counts(
        &self,
        filter: &CountFilter,
    ) -> Result<Vec<CategoryReportCount>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT state_name, category, COUNT(*) AS report_count \
             FROM report_types WHERE state_name <> ''",
        );
        if !filter.categories.is_empty() {
            query
                .push(" AND category = ANY(")
                .push_bind(filter.categories.as_slice())
                .push(")");
        }
        if !filter.states.is_empty() {
            query
                .push(" AND state_name = ANY(")
                .push_bind(filter.states.as_slice())
                .push(")");
        }
        if let Some(start) = filter.start {
            query.push(" AND date_of_incidence >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            query.push(" AND date_of_incidence <= ").push_bind(end);
        }
        query.push(" GROUP BY state_name, category ORDER BY state_name, category");

        Ok(query
            .build_query_as::<CategoryReportCount>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn report_type_counts(
        &self,
        state: &str,
        lga: &str,
        window: Option<DateWindow>,
    ) -> Result<ReportTypeCounts, StoreError> {
        let (start, end) = window_bounds(window);

        let by_category: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT category, COUNT(*) FROM report_types \
             WHERE state_name = $1 AND lga_name = $2 AND {} \
             GROUP BY category ORDER BY category",
            window_clause(3)
        ))
        .bind(state)
        .bind(lga)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let (total_users, total_reports): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(DISTINCT user_id), COUNT(*) FROM report_types \
             WHERE state_name = $1 AND lga_name = $2",
        )
        .bind(state)
        .bind(lga)
        .fetch_one(&self.pool)
        .await?;

        let top_states = sqlx::query_as::<_, StateReportCount>(&format!(
            "SELECT state_name, COUNT(*) AS report_count FROM report_types \
             WHERE lga_name = $1 AND {} \
             GROUP BY state_name ORDER BY report_count DESC, state_name",
            window_clause(2)
        ))
        .bind(lga)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let (report_types, counts) = by_category.into_iter().unzip();
        Ok(ReportTypeCounts {
            report_types,
            counts,
            total_users,
            total_reports,
            top_states,
        })
    }

    async fn reports_posted_today(&self) -> Result<i64, StoreError> {
        let midnight = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM incident_reports WHERE incident_at >= $1",
        )
        .bind(midnight)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn sub_reports_by_type_and_lga(
        &self,
        category: &str,
        lga: &str,
    ) -> Result<Vec<SubReport>, StoreError> {
        Ok(sqlx::query_as::<_, SubReport>(
            "SELECT sr.* FROM sub_reports sr \
             JOIN report_types rt ON rt.id = sr.report_type_id \
             JOIN lgas l ON l.id = sr.lga_id \
             WHERE rt.category = $1 AND l.name = $2 ORDER BY sr.id",
        )
        .bind(category)
        .bind(lga)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn incident_markers(&self) -> Result<Vec<Marker>, StoreError> {
        Ok(sqlx::query_as::<_, Marker>(
            "SELECT DISTINCT ir.latitude AS lat, ir.longitude AS lng, \
             ir.state_name AS popup, per_state.count \
             FROM incident_reports ir \
             JOIN (SELECT state_name, COUNT(*) AS count FROM incident_reports GROUP BY state_name) \
             per_state ON per_state.state_name = ir.state_name \
             ORDER BY popup, lat, lng",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn all_categories(&self) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM report_types ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn all_states(&self) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT state_name FROM report_types ORDER BY state_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn rating_percentages(
        &self,
        category: &str,
        state: &str,
    ) -> Result<RatingPercentage, StoreError> {
        let (good, bad, total): (i64, i64, i64) = sqlx::query_as(
            "SELECT \
             COUNT(*) FILTER (WHERE incident_report_rating = 'good'), \
             COUNT(*) FILTER (WHERE incident_report_rating = 'bad'), \
             COUNT(*) \
             FROM report_types WHERE category = $1 AND state_name = $2",
        )
        .bind(category)
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingPercentage::from_counts(good, bad, total))
    }

    async fn report_counts_by_state_and_lga(&self) -> Result<Vec<ReportCount>, StoreError> {
        Ok(sqlx::query_as::<_, ReportCount>(
            "SELECT state_name, lga_name, COUNT(*) AS count FROM report_types \
             GROUP BY state_name, lga_name ORDER BY state_name, lga_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn top_states(&self) -> Result<Vec<StateReportCount>, StoreError> {
        Ok(sqlx::query_as::<_, StateReportCount>(
            "SELECT state_name, COUNT(*) AS report_count FROM report_types \
             GROUP BY state_name ORDER BY report_count DESC, state_name LIMIT $1",
        )
        .bind(TOP_STATES_LIMIT)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn total_report_count(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM report_types")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn sub_report_names(
        &self,
        state: &str,
        lga_id: Uuid,
        category: &str,
    ) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT sub_report_type FROM sub_reports \
             WHERE state_name = $1 AND lga_id = $2 AND report_type_category = $3 ORDER BY id",
        )
        .bind(state)
        .bind(lga_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_reward(&self, reward: NewReward) -> Result<Reward, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE user_id = $1 FOR UPDATE")
                .bind(reward.user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let stored = match existing {
            Some(mut current) => {
                current.overwrite_with(&reward);
                sqlx::query_as::<_, Reward>(
                    "UPDATE rewards SET reward_type = $2, point = $3, balance = $4, \
                     incident_report_id = $5 WHERE id = $1 RETURNING *",
                )
                .bind(current.id)
                .bind(&current.reward_type)
                .bind(current.point)
                .bind(current.balance)
                .bind(current.incident_report_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                debug!("first reward for user {}", reward.user_id);
                sqlx::query_as::<_, Reward>(
                    "INSERT INTO rewards (user_id, reward_type, point, balance, incident_report_id) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING *",
                )
                .bind(reward.user_id)
                .bind(&reward.reward_type)
                .bind(reward.point)
                .bind(reward.balance)
                .bind(reward.incident_report_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(stored)
    }

    async fn find_reward(&self, user_id: UserId) -> Result<Reward, StoreError> {
        sqlx::query_as::<_, Reward>("SELECT * FROM rewards WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("reward"))
    }

    async fn has_previous_reports(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rewards WHERE user_id = $1 AND balance > 0)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn is_bookmarked(&self, user_id: UserId, report_id: Uuid) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bookmark_reports WHERE user_id = $1 AND report_id = $2)",
        )
        .bind(user_id)
        .bind(report_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn save_bookmark(&self, bookmark: BookmarkReport) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO bookmark_reports (user_id, report_id) VALUES ($1, $2)")
            .bind(bookmark.user_id)
            .bind(bookmark.report_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict(_) => StoreError::Conflict(format!(
                    "report {} already bookmarked by user {}",
                    bookmark.report_id, bookmark.user_id
                )),
                other => other,
            })?;

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO lgas (id, name) VALUES ($1, $2)")
            .bind(lga.id)
            .bind(&lga.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO states (id, name) VALUES ($1, $2)")
            .bind(state.id)
            .bind(&state.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO report_types \
             (id, user_id, category, state_name, lga_name, incident_report_rating, date_of_incidence) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(report_type.id)
        .bind(report_type.user_id)
        .bind(&report_type.category)
        .bind(&report_type.state_name)
        .bind(&report_type.lga_name)
        .bind(&report_type.incident_report_rating)
        .bind(report_type.date_of_incidence)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO sub_reports \
             (id, report_type_id, lga_id, state_name, report_type_category, sub_report_type) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(sub_report.id)
        .bind(sub_report.report_type_id)
        .bind(sub_report.lga_id)
        .bind(&sub_report.state_name)
        .bind(&sub_report.report_type_category)
        .bind(&sub_report.sub_report_type)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_sub_report(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM sub_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        require_row(result, "sub report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::testing;

    fn report(state: &str) -> IncidentReport {
        IncidentReport {
            id: Uuid::new_v4(),
            user_id: 1,
            state_name: state.to_string(),
            lga_name: "Ikeja".to_string(),
            category: "Flood".to_string(),
            description: "water everywhere".to_string(),
            image_url: None,
            latitude: 6.6,
            longitude: 3.3,
            rating: None,
            status: IncidentReport::STATUS_PENDING.to_string(),
            incident_at: Utc::now(),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn report_round_trip_and_status() {
        let store = testing::store().await;
        let state = format!("state-{}", Uuid::new_v4().simple());
        let created = store.create_report(report(&state)).await.unwrap();

        assert_eq!(store.report_status(created.id).await.unwrap(), "pending");
        let listed = store.list_reports_by_state(&state, Page::FIRST).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.list_reports_by_state(&state, Page::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn reward_overwrites_balance() {
        let store = testing::store().await;
        let user_id = i64::from(rand_user());
        let reward = |balance| NewReward {
            user_id,
            reward_type: "report".to_string(),
            point: 5,
            balance,
            incident_report_id: None,
        };

        store.update_reward(reward(10)).await.unwrap();
        store.update_reward(reward(30)).await.unwrap();
        store.update_reward(reward(0)).await.unwrap();

        assert_eq!(store.find_reward(user_id).await.unwrap().balance, 30);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_bookmark_conflicts() {
        let store = testing::store().await;
        let bookmark = BookmarkReport {
            user_id: i64::from(rand_user()),
            report_id: Uuid::new_v4(),
        };

        store.save_bookmark(bookmark).await.unwrap();
        assert!(store.is_bookmarked(bookmark.user_id, bookmark.report_id).await.unwrap());
        assert!(store.save_bookmark(bookmark).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn region_report_is_all_or_nothing() {
        let store = testing::store().await;
        let lga = Lga {
            id: Uuid::new_v4(),
            name: "Ikeja".to_string(),
        };
        let state = State {
            id: Uuid::new_v4(),
            name: "Lagos".to_string(),
        };
        let report_type = ReportType {
            id: Uuid::new_v4(),
            user_id: 1,
            category: "Flood".to_string(),
            state_name: "Lagos".to_string(),
            lga_name: "Ikeja".to_string(),
            incident_report_rating: None,
            date_of_incidence: Utc::now(),
        };
        // Points at an lga that is never inserted, so the last insert fails.
        let sub_report = SubReport {
            id: Uuid::new_v4(),
            report_type_id: report_type.id,
            lga_id: Uuid::new_v4(),
            state_name: "Lagos".to_string(),
            report_type_category: "Flood".to_string(),
            sub_report_type: "Blocked drain".to_string(),
        };

        let lga_id = lga.id;
        assert!(
            matches!(
                store
                    .save_region_report(lga, state, report_type, sub_report)
                    .await,
                Err(StoreError::InvalidInput(_))
            )
        );

        let kept: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lgas WHERE id = $1")
            .bind(lga_id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(kept, 0);
    }

    fn rand_user() -> u32 {
        Uuid::new_v4().as_u128() as u32
    }
}
