//! Audit trail for register writes
//!
//! Every transaction that changes a vehicle register records who caused it in
//! `audit.transaction_to_modifier`. The row is written inside the same transaction, so the
//! transaction id defaults to the current one and the mapping commits or rolls back together
//! with the data change.
//!
//! Row-level changes of the vehicle registers land in `audit.logged_actions` through database
//! triggers. Entries older than the configured retention are removed by [`cleanup`].
//!
//! ```no_run
//! use retrofit_server::audit;
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: &PgPool, uploader_id: Uuid) -> Result<(), sqlx::Error> {
//! let mut tx = pool.begin().await?;
//! audit::tag_current_transaction(&mut *tx, &uploader_id.to_string()).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod queries;

pub use cleanup::{cleanup_old_audit_data, spawn_cleanup_task, AuditCleanup};
pub use queries::{find_by_modifier, tag_current_transaction, TransactionModifier};
