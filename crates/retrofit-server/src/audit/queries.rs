//! Database queries for the transaction audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

/// One transaction attributed to a modifier
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionModifier {
    pub transaction_id: i64,
    pub modifier_id: String,
    pub inserted_timestamp: DateTime<Utc>,
}

/// Record `modifier_id` as the author of the transaction running on `conn`
pub async fn tag_current_transaction(
    conn: &mut PgConnection,
    modifier_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO audit.transaction_to_modifier (modifier_id) VALUES ($1)")
        .bind(modifier_id)
        .execute(conn)
        .await?;

    debug!(modifier_id = %modifier_id, "Tagged transaction with modifier");

    Ok(())
}

/// All transactions attributed to `modifier_id`, oldest first
pub async fn find_by_modifier(
    pool: &PgPool,
    modifier_id: &str,
) -> Result<Vec<TransactionModifier>, sqlx::Error> {
    sqlx::query_as::<_, TransactionModifier>(
        r#"
        SELECT transaction_id, modifier_id, inserted_timestamp
        FROM audit.transaction_to_modifier
        WHERE modifier_id = $1
        ORDER BY inserted_timestamp, transaction_id
        "#,
    )
    .bind(modifier_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn test_tag_commits_with_transaction(pool: PgPool) -> sqlx::Result<()> {
        let mut tx = pool.begin().await?;
        tag_current_transaction(&mut *tx, "modifier-1").await?;
        let (txid,): (i64,) = sqlx::query_as("SELECT txid_current()")
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        let tagged = find_by_modifier(&pool, "modifier-1").await?;

        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].transaction_id, txid);
        Ok(())
    }

    #[sqlx::test]
    async fn test_tag_rolls_back_with_transaction(pool: PgPool) -> sqlx::Result<()> {
        let mut tx = pool.begin().await?;
        tag_current_transaction(&mut *tx, "modifier-2").await?;
        tx.rollback().await?;

        assert!(find_by_modifier(&pool, "modifier-2").await?.is_empty());
        Ok(())
    }
}
