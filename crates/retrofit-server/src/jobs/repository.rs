//! Register job persistence
//!
//! Status updates are guarded in SQL: a row only moves when its current status is one the state
//! machine allows to reach the target, so a terminal job is never rewritten.

use chrono::{DateTime, Utc};
use retrofit_common::types::{RegisterJobStatus, RegisterJobTrigger};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{DbError, DbResult};
use crate::jobs::models::{RegisterJob, RegisterJobError};

/// Fields of a job about to be inserted in `STARTING`
#[derive(Debug, Clone)]
pub struct NewRegisterJob {
    pub id: Uuid,
    pub job_name: String,
    pub uploader_id: Uuid,
    pub trigger: RegisterJobTrigger,
    pub correlation_id: String,
}

#[derive(sqlx::FromRow)]
struct RegisterJobRow {
    register_job_id: Uuid,
    job_name: String,
    uploader_id: Uuid,
    trigger: String,
    status: String,
    correlation_id: String,
}

impl RegisterJobRow {
    fn into_job(self, errors: Vec<RegisterJobError>) -> DbResult<RegisterJob> {
        let trigger = self
            .trigger
            .parse()
            .map_err(|_| DbError::corrupt("trigger", &self.trigger))?;
        let status = self
            .status
            .parse()
            .map_err(|_| DbError::corrupt("status", &self.status))?;

        Ok(RegisterJob {
            id: self.register_job_id,
            job_name: self.job_name,
            uploader_id: self.uploader_id,
            trigger,
            status,
            correlation_id: self.correlation_id,
            errors,
        })
    }
}

/// Statuses from which `to` may be reached
fn predecessors(to: RegisterJobStatus) -> Vec<&'static str> {
    RegisterJobStatus::ALL
        .iter()
        .filter(|from| from.can_transition_to(to))
        .map(|from| from.as_str())
        .collect()
}

fn active_statuses() -> Vec<&'static str> {
    RegisterJobStatus::ACTIVE.iter().map(|s| s.as_str()).collect()
}

pub async fn insert(pool: &PgPool, job: &NewRegisterJob) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO t_register_job
            (register_job_id, job_name, uploader_id, trigger, status, correlation_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(job.id)
    .bind(&job.job_name)
    .bind(job.uploader_id)
    .bind(job.trigger.as_str())
    .bind(RegisterJobStatus::Starting.as_str())
    .bind(&job.correlation_id)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            DbError::duplicate("Register job", &job.job_name)
        },
        other => DbError::from(other),
    })?;

    Ok(())
}

async fn load_errors(pool: &PgPool, job_id: Uuid) -> DbResult<Vec<RegisterJobError>> {
    let errors = sqlx::query_as::<_, RegisterJobError>(
        r#"
        SELECT subject_id, title, detail
        FROM t_register_job_error
        WHERE register_job_id = $1
        ORDER BY position
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(errors)
}

pub async fn find_by_name(pool: &PgPool, job_name: &str) -> DbResult<Option<RegisterJob>> {
    let row = sqlx::query_as::<_, RegisterJobRow>(
        r#"
        SELECT register_job_id, job_name, uploader_id, trigger, status, correlation_id
        FROM t_register_job
        WHERE job_name = $1
        "#,
    )
    .bind(job_name)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let errors = load_errors(pool, row.register_job_id).await?;
            row.into_job(errors).map(Some)
        },
        None => Ok(None),
    }
}

pub async fn find_by_id(pool: &PgPool, job_id: Uuid) -> DbResult<Option<RegisterJob>> {
    let row = sqlx::query_as::<_, RegisterJobRow>(
        r#"
        SELECT register_job_id, job_name, uploader_id, trigger, status, correlation_id
        FROM t_register_job
        WHERE register_job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let errors = load_errors(pool, row.register_job_id).await?;
            row.into_job(errors).map(Some)
        },
        None => Ok(None),
    }
}

pub async fn has_active_jobs(pool: &PgPool, trigger: RegisterJobTrigger) -> DbResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM t_register_job
            WHERE trigger = $1 AND status = ANY($2)
        )
        "#,
    )
    .bind(trigger.as_str())
    .bind(active_statuses())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Move a job to `to` and append `errors`, in one transaction.
///
/// Returns `false` without writing anything when the job does not exist or its current status
/// cannot reach `to`.
pub async fn update_status(
    pool: &PgPool,
    job_id: Uuid,
    to: RegisterJobStatus,
    errors: &[RegisterJobError],
) -> DbResult<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE t_register_job
        SET status = $2, last_modified_timestamp = NOW()
        WHERE register_job_id = $1 AND status = ANY($3)
        "#,
    )
    .bind(job_id)
    .bind(to.as_str())
    .bind(predecessors(to))
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    if !errors.is_empty() {
        let offset = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM t_register_job_error WHERE register_job_id = $1",
        )
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO t_register_job_error (register_job_id, position, subject_id, title, detail) ",
        );
        query_builder.push_values(errors.iter().zip(offset..), |mut b, (error, position)| {
            b.push_bind(job_id)
                .push_bind(position)
                .push_bind(&error.subject_id)
                .push_bind(&error.title)
                .push_bind(&error.detail);
        });
        query_builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(true)
}

/// Ids of active jobs last modified before `older_than`
pub async fn find_stale(pool: &PgPool, older_than: DateTime<Utc>) -> DbResult<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT register_job_id FROM t_register_job
        WHERE status = ANY($1) AND last_modified_timestamp <= $2
        ORDER BY inserted_timestamp
        "#,
    )
    .bind(active_statuses())
    .bind(older_than)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
