//! Vehicle register tables
//!
//! Each trigger owns one table with the same shape. Reconciliation reads a whole table and writes
//! a delta back inside the caller's transaction.

use retrofit_common::types::RegisterJobTrigger;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::db::DbResult;
use crate::ingest::models::VehicleRecord;
use crate::ingest::reconcile::ReconciliationDelta;

/// Rows per INSERT statement (four binds per row keeps well below the bind limit)
const INSERT_BATCH_SIZE: usize = 1_000;

/// Table holding the register a trigger reconciles
pub fn table_for(trigger: RegisterJobTrigger) -> &'static str {
    match trigger {
        RegisterJobTrigger::RetrofitCsvFromS3 => "t_vehicle_retrofit",
        RegisterJobTrigger::GreenModCsvFromS3 => "t_vehicle_mod_green",
        RegisterJobTrigger::WhiteModCsvFromS3 => "t_vehicle_mod_white",
    }
}

/// Counts of rows changed by [`apply_delta`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedDelta {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// Block other writers of the trigger's table until the transaction ends
pub async fn lock_for_reconciliation(
    conn: &mut PgConnection,
    trigger: RegisterJobTrigger,
) -> DbResult<()> {
    sqlx::query(&format!("LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE", table_for(trigger)))
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn load_all(
    conn: &mut PgConnection,
    trigger: RegisterJobTrigger,
) -> DbResult<Vec<VehicleRecord>> {
    let records = sqlx::query_as::<_, VehicleRecord>(&format!(
        r#"
        SELECT vrn, vehicle_category, model, date_of_retrofit_installation
        FROM {}
        "#,
        table_for(trigger)
    ))
    .fetch_all(conn)
    .await?;

    Ok(records)
}

pub async fn find_by_vrn(
    pool: &PgPool,
    trigger: RegisterJobTrigger,
    vrn: &str,
) -> DbResult<Option<VehicleRecord>> {
    let record = sqlx::query_as::<_, VehicleRecord>(&format!(
        r#"
        SELECT vrn, vehicle_category, model, date_of_retrofit_installation
        FROM {}
        WHERE vrn = $1
        "#,
        table_for(trigger)
    ))
    .bind(vrn)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Write a reconciliation delta. Deletes run in chunks of `delete_batch_size` VRNs.
pub async fn apply_delta(
    conn: &mut PgConnection,
    trigger: RegisterJobTrigger,
    delta: &ReconciliationDelta,
    delete_batch_size: usize,
) -> DbResult<AppliedDelta> {
    let table = table_for(trigger);
    let mut applied = AppliedDelta::default();

    for chunk in delta.to_delete.chunks(delete_batch_size.max(1)) {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE vrn = ANY($1)", table))
            .bind(chunk)
            .execute(&mut *conn)
            .await?;
        applied.deleted += result.rows_affected();
    }

    for record in &delta.to_update {
        let result = sqlx::query(&format!(
            r#"
            UPDATE {}
            SET vehicle_category = $2, model = $3, date_of_retrofit_installation = $4
            WHERE vrn = $1
            "#,
            table
        ))
        .bind(&record.vrn)
        .bind(&record.vehicle_category)
        .bind(&record.model)
        .bind(record.date_of_retrofit_installation)
        .execute(&mut *conn)
        .await?;
        applied.updated += result.rows_affected();
    }

    for chunk in delta.to_insert.chunks(INSERT_BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (vrn, vehicle_category, model, date_of_retrofit_installation) ",
            table
        ));

        query_builder.push_values(chunk.iter(), |mut b, record| {
            b.push_bind(&record.vrn)
                .push_bind(&record.vehicle_category)
                .push_bind(&record.model)
                .push_bind(record.date_of_retrofit_installation);
        });

        let result = query_builder.build().execute(&mut *conn).await?;
        applied.inserted += result.rows_affected();
    }

    debug!(
        table,
        inserted = applied.inserted,
        updated = applied.updated,
        deleted = applied.deleted,
        "Applied reconciliation delta"
    );

    Ok(applied)
}
