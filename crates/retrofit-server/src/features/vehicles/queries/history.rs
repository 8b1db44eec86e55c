//! Retrofit history query
//!
//! Pages through the change log of one VRN in the retrofit register, newest first. Dates in the
//! request and in the response are calendar days in UK local time.

use chrono::NaiveDate;
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::DbError;

const HISTORY_FILTER: &str = r#"
    FROM audit.logged_actions a
    WHERE a.table_name = 't_vehicle_retrofit'
      AND (a.new_data ->> 'vrn' = $1 OR a.original_data ->> 'vrn' = $1)
      AND a.action_tstamp >= (($2::date)::timestamp AT TIME ZONE 'Europe/London')
      AND a.action_tstamp < ((($3::date) + 1)::timestamp AT TIME ZONE 'Europe/London')
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVehicleHistoryQuery {
    /// Taken from the path
    #[serde(skip)]
    pub vrn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
}

/// One change of a vehicle's register entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleChange {
    pub modify_date: NaiveDate,
    /// `Created`, `Updated` or `Removed`
    pub action: String,
    pub vehicle_category: Option<String>,
    pub model: Option<String>,
    pub date_of_retrofit: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleHistoryResponse {
    pub page: i64,
    pub page_count: i64,
    pub per_page: i64,
    pub total_changes_count: i64,
    pub changes: Vec<VehicleChange>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetVehicleHistoryError {
    #[error("'startDate' cannot be null")]
    StartDateRequired,
    #[error("'endDate' cannot be null")]
    EndDateRequired,
    #[error("'startDate' need to be before 'endDate'")]
    StartAfterEnd,
    #[error("'pageNumber' cannot be null or negative")]
    InvalidPageNumber,
    #[error("'pageSize' must be at least 1")]
    InvalidPageSize,
    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for GetVehicleHistoryError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

impl Request<Result<VehicleHistoryResponse, GetVehicleHistoryError>> for GetVehicleHistoryQuery {}

/// A validated request
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryPage {
    vrn: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    page_number: i64,
    page_size: i64,
}

impl HistoryPage {
    fn offset(&self) -> i64 {
        self.page_number.saturating_mul(self.page_size)
    }
}

impl GetVehicleHistoryQuery {
    fn validate(&self) -> Result<HistoryPage, GetVehicleHistoryError> {
        let start_date = self.start_date.ok_or(GetVehicleHistoryError::StartDateRequired)?;
        let end_date = self.end_date.ok_or(GetVehicleHistoryError::EndDateRequired)?;
        if start_date > end_date {
            return Err(GetVehicleHistoryError::StartAfterEnd);
        }

        let page_number = self
            .page_number
            .filter(|page| *page >= 0)
            .ok_or(GetVehicleHistoryError::InvalidPageNumber)?;
        let page_size = self
            .page_size
            .filter(|size| *size >= 1)
            .ok_or(GetVehicleHistoryError::InvalidPageSize)?;

        Ok(HistoryPage {
            vrn: self.vrn.chars().filter(|c| !c.is_whitespace()).collect(),
            start_date,
            end_date,
            page_number,
            page_size,
        })
    }
}

fn page_count(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: GetVehicleHistoryQuery,
) -> Result<VehicleHistoryResponse, GetVehicleHistoryError> {
    let page = query.validate()?;

    let changes = sqlx::query_as::<_, VehicleChange>(&format!(
        r#"
        SELECT
            (a.action_tstamp AT TIME ZONE 'Europe/London')::date AS modify_date,
            CASE a.action WHEN 'I' THEN 'Created' WHEN 'U' THEN 'Updated' ELSE 'Removed' END AS action,
            COALESCE(a.new_data, a.original_data) ->> 'vehicle_category' AS vehicle_category,
            COALESCE(a.new_data, a.original_data) ->> 'model' AS model,
            (COALESCE(a.new_data, a.original_data) ->> 'date_of_retrofit_installation')::date
                AS date_of_retrofit
        {}
        ORDER BY a.action_tstamp DESC, a.event_id DESC
        LIMIT $4 OFFSET $5
        "#,
        HISTORY_FILTER
    ))
    .bind(&page.vrn)
    .bind(page.start_date)
    .bind(page.end_date)
    .bind(page.page_size)
    .bind(page.offset())
    .fetch_all(&pool)
    .await?;

    // A short first page already holds every change
    let total = if page.page_number == 0 && (changes.len() as i64) < page.page_size {
        changes.len() as i64
    } else {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", HISTORY_FILTER))
            .bind(&page.vrn)
            .bind(page.start_date)
            .bind(page.end_date)
            .fetch_one(&pool)
            .await?
    };

    Ok(VehicleHistoryResponse {
        page: page.page_number,
        page_count: page_count(total, page.page_size),
        per_page: page.page_size,
        total_changes_count: total,
        changes,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn query(
        vrn: &str,
        start: NaiveDate,
        end: NaiveDate,
        page: i64,
        size: i64,
    ) -> GetVehicleHistoryQuery {
        GetVehicleHistoryQuery {
            vrn: vrn.to_string(),
            start_date: Some(start),
            end_date: Some(end),
            page_number: Some(page),
            page_size: Some(size),
        }
    }

    async fn log_action(
        pool: &PgPool,
        action: &str,
        at: &str,
        original: Option<serde_json::Value>,
        new: Option<serde_json::Value>,
    ) {
        sqlx::query(
            r#"
            INSERT INTO audit.logged_actions
                (schema_name, table_name, action, action_tstamp, original_data, new_data)
            VALUES ('public', 't_vehicle_retrofit', $1, $2::timestamptz, $3, $4)
            "#,
        )
        .bind(action)
        .bind(at)
        .bind(original)
        .bind(new)
        .execute(pool)
        .await
        .unwrap();
    }

    fn entry(vrn: &str, category: &str, installed: &str) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "vrn": vrn,
            "vehicle_category": category,
            "model": null,
            "date_of_retrofit_installation": installed,
        }))
    }

    #[test]
    fn test_validate_requires_dates_and_paging() {
        let full = query("AB12CDE", date(2020, 7, 1), date(2020, 7, 30), 0, 3);
        assert!(full.validate().is_ok());

        let mut missing = full.clone();
        missing.start_date = None;
        assert!(matches!(missing.validate(), Err(GetVehicleHistoryError::StartDateRequired)));

        let mut missing = full.clone();
        missing.end_date = None;
        assert!(matches!(missing.validate(), Err(GetVehicleHistoryError::EndDateRequired)));

        let reversed = query("AB12CDE", date(2020, 7, 30), date(2020, 7, 1), 0, 3);
        assert!(matches!(reversed.validate(), Err(GetVehicleHistoryError::StartAfterEnd)));

        let negative_page = query("AB12CDE", date(2020, 7, 1), date(2020, 7, 1), -1, 3);
        assert!(matches!(negative_page.validate(), Err(GetVehicleHistoryError::InvalidPageNumber)));

        let empty_page = query("AB12CDE", date(2020, 7, 1), date(2020, 7, 1), 0, 0);
        assert!(matches!(empty_page.validate(), Err(GetVehicleHistoryError::InvalidPageSize)));
    }

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(page_count(0, 3), 0);
        assert_eq!(page_count(3, 3), 1);
        assert_eq!(page_count(4, 3), 2);
    }

    #[sqlx::test]
    async fn test_history_lists_changes_newest_first(pool: PgPool) {
        log_action(&pool, "I", "2020-07-02 10:00:00+00", None, entry("JO32VXX", "M1", "2019-04-13")).await;
        log_action(
            &pool,
            "U",
            "2020-07-10 10:00:00+00",
            entry("JO32VXX", "M1", "2019-04-13"),
            entry("JO32VXX", "N2", "2019-04-13"),
        )
        .await;
        log_action(&pool, "D", "2020-07-27 10:00:00+00", entry("JO32VXX", "N2", "2019-04-13"), None).await;
        log_action(&pool, "I", "2020-07-05 10:00:00+00", None, entry("DS98UDG", "M1", "2019-03-11")).await;

        let response = handle(pool, query("JO32VXX", date(2020, 7, 1), date(2020, 7, 30), 0, 3))
            .await
            .unwrap();

        assert_eq!(response.total_changes_count, 3);
        assert_eq!(response.page_count, 1);
        assert_eq!(response.per_page, 3);
        let actions: Vec<_> = response.changes.iter().map(|c| c.action.as_str()).collect();
        assert_eq!(actions, vec!["Removed", "Updated", "Created"]);
        assert_eq!(
            response.changes[0],
            VehicleChange {
                modify_date: date(2020, 7, 27),
                action: "Removed".to_string(),
                vehicle_category: Some("N2".to_string()),
                model: None,
                date_of_retrofit: Some(date(2019, 4, 13)),
            }
        );
        assert_eq!(response.changes[1].vehicle_category.as_deref(), Some("N2"));
    }

    #[sqlx::test]
    async fn test_history_pages_and_counts(pool: PgPool) {
        for day in 1..=5 {
            let at = format!("2020-07-{:02} 10:00:00+00", day);
            log_action(&pool, "I", &at, None, entry("AB12CDE", "M1", "2019-01-01")).await;
        }

        let second = handle(pool.clone(), query("AB12CDE", date(2020, 7, 1), date(2020, 7, 30), 1, 2))
            .await
            .unwrap();
        assert_eq!(second.total_changes_count, 5);
        assert_eq!(second.page_count, 3);
        assert_eq!(second.changes.len(), 2);
        assert_eq!(second.changes[0].modify_date, date(2020, 7, 3));

        let beyond = handle(pool, query("AB12CDE", date(2020, 7, 1), date(2020, 7, 30), 89, 2))
            .await
            .unwrap();
        assert!(beyond.changes.is_empty());
        assert_eq!(beyond.page, 89);
    }

    #[sqlx::test]
    async fn test_history_days_are_uk_local(pool: PgPool) {
        // 23:30 UTC on the 15th is already the 16th in British Summer Time
        log_action(&pool, "I", "2020-07-15 23:30:00+00", None, entry("BST1235", "M1", "2019-01-01")).await;

        let on_16th = handle(pool.clone(), query("BST1235", date(2020, 7, 16), date(2020, 7, 16), 0, 3))
            .await
            .unwrap();
        assert_eq!(on_16th.total_changes_count, 1);
        assert_eq!(on_16th.changes[0].modify_date, date(2020, 7, 16));

        let on_15th = handle(pool, query("BST1235", date(2020, 7, 15), date(2020, 7, 15), 0, 3))
            .await
            .unwrap();
        assert_eq!(on_15th.total_changes_count, 0);
        assert_eq!(on_15th.page_count, 0);
    }
}
