//! Removal of expired audit entries
//!
//! Both the row-level change log and the transaction-to-modifier mapping are pruned in one
//! transaction. The server runs the cleanup once at startup and then on a fixed interval.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use crate::config::AuditConfig;

/// Rows removed by one cleanup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditCleanup {
    pub logged_actions: u64,
    pub transaction_modifiers: u64,
}

/// Delete audit entries recorded before `cutoff`
#[instrument(skip(pool))]
pub async fn delete_older_than(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<AuditCleanup, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let logged_actions = sqlx::query("DELETE FROM audit.logged_actions WHERE action_tstamp < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let transaction_modifiers =
        sqlx::query("DELETE FROM audit.transaction_to_modifier WHERE inserted_timestamp < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    tx.commit().await?;

    info!(logged_actions, transaction_modifiers, "Old audit data removed");

    Ok(AuditCleanup {
        logged_actions,
        transaction_modifiers,
    })
}

/// Delete audit entries older than `retention`
pub async fn cleanup_old_audit_data(
    pool: &PgPool,
    retention: chrono::Duration,
) -> Result<AuditCleanup, sqlx::Error> {
    delete_older_than(pool, Utc::now() - retention).await
}

/// Run [`cleanup_old_audit_data`] now and then every `cleanup_interval`
pub fn spawn_cleanup_task(pool: PgPool, config: AuditConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.cleanup_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = cleanup_old_audit_data(&pool, config.retention()).await {
                error!(error = %e, "Audit cleanup failed");
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn log_action_at(pool: &PgPool, at: DateTime<Utc>) {
        sqlx::query(
            r#"
            INSERT INTO audit.logged_actions (schema_name, table_name, action, action_tstamp, new_data)
            VALUES ('public', 't_vehicle_retrofit', 'I', $1, '{"vrn": "AB12CDE"}')
            "#,
        )
        .bind(at)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn tag_modifier_at(pool: &PgPool, modifier_id: &str, at: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO audit.transaction_to_modifier (modifier_id, inserted_timestamp) VALUES ($1, $2)",
        )
        .bind(modifier_id)
        .bind(at)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn test_cleanup_keeps_entries_within_retention(pool: PgPool) {
        let now = Utc::now();
        log_action_at(&pool, now - chrono::Duration::days(400)).await;
        log_action_at(&pool, now - chrono::Duration::days(366)).await;
        log_action_at(&pool, now - chrono::Duration::days(10)).await;
        tag_modifier_at(&pool, "old", now - chrono::Duration::days(500)).await;
        tag_modifier_at(&pool, "recent", now).await;

        let removed = cleanup_old_audit_data(&pool, chrono::Duration::days(365))
            .await
            .unwrap();

        assert_eq!(
            removed,
            AuditCleanup {
                logged_actions: 2,
                transaction_modifiers: 1,
            }
        );
        assert_eq!(count(&pool, "audit.logged_actions").await, 1);
        let remaining = crate::audit::find_by_modifier(&pool, "recent").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(crate::audit::find_by_modifier(&pool, "old").await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_cleanup_with_nothing_expired(pool: PgPool) {
        log_action_at(&pool, Utc::now()).await;

        let removed = cleanup_old_audit_data(&pool, chrono::Duration::days(1)).await.unwrap();

        assert_eq!(removed, AuditCleanup::default());
        assert_eq!(count(&pool, "audit.logged_actions").await, 1);
    }

    #[sqlx::test]
    async fn test_cleanup_task_runs_immediately(pool: PgPool) {
        log_action_at(&pool, Utc::now() - chrono::Duration::days(30)).await;
        let config = AuditConfig {
            retention_days: 7,
            cleanup_interval_secs: 3600,
        };

        let handle = spawn_cleanup_task(pool.clone(), config);

        let mut remaining = 1;
        for _ in 0..200 {
            remaining = count(&pool, "audit.logged_actions").await;
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        handle.abort();

        assert_eq!(remaining, 0);
    }
}
