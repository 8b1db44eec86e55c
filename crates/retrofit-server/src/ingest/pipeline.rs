//! CSV ingestion pipeline
//!
//! ```text
//! bytes -> lines -> fields -> validate/convert -> errors? -> reconcile -> persist + audit
//! ```
//!
//! Any row error fails the whole file and nothing is written. A valid file replaces the
//! trigger's register in one transaction that also records the uploader in the audit trail.

use retrofit_common::types::RegisterJobTrigger;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::audit;
use crate::config::RegisterConfig;
use crate::db::DbError;
use crate::ingest::converter::RowConverter;
use crate::ingest::csv;
use crate::ingest::models::VehicleRecord;
use crate::ingest::reconcile::ReconciliationEngine;
use crate::ingest::repository;
use crate::ingest::validation::ValidationError;

pub const NO_DATA_ROWS: &str = "The file does not contain any data rows.";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Invalid row validator: {0}")]
    Validator(#[from] regex::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

/// Outcome of parsing and validating a file, before anything is persisted
#[derive(Debug)]
pub enum ProcessedFile {
    /// Every row is valid. Records are in line order and may repeat a VRN.
    Valid(Vec<VehicleRecord>),
    /// Errors ordered by line and capped at the configured maximum
    Invalid(Vec<ValidationError>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineResult {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    pub errors: Vec<ValidationError>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct CsvIngestionPipeline {
    pool: PgPool,
    converter: RowConverter,
    max_errors_count: usize,
    delete_batch_size: usize,
}

impl CsvIngestionPipeline {
    pub fn new(pool: PgPool, config: &RegisterConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            pool,
            converter: RowConverter::new()?,
            max_errors_count: config.max_errors_count,
            delete_batch_size: config.delete_batch_size,
        })
    }

    /// Parse, validate and convert a file without touching the database
    pub fn process(&self, bytes: &[u8]) -> ProcessedFile {
        let content = csv::read_rows(bytes, self.max_errors_count);
        if content.is_empty() {
            return ProcessedFile::Invalid(vec![ValidationError::value_error(None, NO_DATA_ROWS)]);
        }

        let converted = self.converter.convert_all(&content.rows, self.max_errors_count);

        let mut errors = content.errors;
        errors.extend(converted.errors);
        if errors.is_empty() {
            return ProcessedFile::Valid(converted.records);
        }

        errors.sort_by_key(ValidationError::line_number);
        errors.truncate(self.max_errors_count);
        ProcessedFile::Invalid(errors)
    }

    /// Run the whole pipeline for one job
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn execute(
        &self,
        bytes: &[u8],
        uploader_id: Uuid,
        trigger: RegisterJobTrigger,
        job_id: Uuid,
    ) -> Result<PipelineResult, PipelineError> {
        let records = match self.process(bytes) {
            ProcessedFile::Valid(records) => records,
            ProcessedFile::Invalid(errors) => {
                info!(errors = errors.len(), "File rejected by validation");
                return Ok(PipelineResult {
                    errors,
                    ..Default::default()
                });
            },
        };

        let mut tx = self.pool.begin().await?;

        repository::lock_for_reconciliation(&mut *tx, trigger).await?;
        let existing = repository::load_all(&mut *tx, trigger).await?;
        let delta = ReconciliationEngine::reconcile(existing, records);
        let applied =
            repository::apply_delta(&mut *tx, trigger, &delta, self.delete_batch_size).await?;
        audit::tag_current_transaction(&mut *tx, &uploader_id.to_string()).await?;

        tx.commit().await?;

        info!(
            inserted = applied.inserted,
            updated = applied.updated,
            deleted = applied.deleted,
            "Register reconciled"
        );

        Ok(PipelineResult {
            inserted: applied.inserted,
            updated: applied.updated,
            deleted: applied.deleted,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pipeline(pool: PgPool, max_errors_count: usize) -> CsvIngestionPipeline {
        let config = RegisterConfig {
            max_errors_count,
            ..Default::default()
        };
        CsvIngestionPipeline::new(pool, &config).unwrap()
    }

    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgresql://localhost/unused").unwrap()
    }

    fn invalid(processed: ProcessedFile) -> Vec<ValidationError> {
        match processed {
            ProcessedFile::Invalid(errors) => errors,
            ProcessedFile::Valid(records) => panic!("expected errors, got {:?}", records),
        }
    }

    #[tokio::test]
    async fn test_process_empty_file() {
        let errors = invalid(pipeline(lazy_pool(), 10).process(b""));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].detail(), NO_DATA_ROWS);
    }

    #[tokio::test]
    async fn test_process_merges_errors_in_line_order() {
        let file = b"AB12CDE,M1,Tesla,2019-03-04\nbroken\nABCDEFGHIJ,,,2019-03-04\nXY99ABC,,,2020-01-01";

        let errors = invalid(pipeline(lazy_pool(), 10).process(file));

        let lines: Vec<_> = errors.iter().map(ValidationError::line_number).collect();
        assert_eq!(lines, vec![Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_process_caps_errors() {
        let file = b"a\nb\nc\nd\ne";

        let errors = invalid(pipeline(lazy_pool(), 3).process(file));

        assert_eq!(errors.len(), 3);
    }

    #[sqlx::test]
    async fn test_execute_twice_on_same_file_changes_nothing(pool: PgPool) -> sqlx::Result<()> {
        let file = b"AB12CDE,M1,Tesla,2019-03-04\nXY99ABC,N2,,2020-01-01\nCD34EFG,,,2021-07-07";
        let pipeline = pipeline(pool.clone(), 10);
        let uploader_id = Uuid::new_v4();
        let trigger = RegisterJobTrigger::RetrofitCsvFromS3;

        let first = pipeline.execute(file, uploader_id, trigger, Uuid::new_v4()).await.unwrap();
        assert!(first.is_success());
        assert_eq!((first.inserted, first.updated, first.deleted), (3, 0, 0));

        let second = pipeline.execute(file, uploader_id, trigger, Uuid::new_v4()).await.unwrap();
        assert_eq!(
            second,
            PipelineResult {
                inserted: 0,
                updated: 0,
                deleted: 0,
                errors: Vec::new(),
            }
        );

        let tagged = audit::find_by_modifier(&pool, &uploader_id.to_string()).await?;
        assert_eq!(tagged.len(), 2);
        assert_ne!(tagged[0].transaction_id, tagged[1].transaction_id);
        Ok(())
    }

    #[sqlx::test]
    async fn test_execute_rejected_file_writes_nothing(pool: PgPool) -> sqlx::Result<()> {
        let uploader_id = Uuid::new_v4();

        let result = pipeline(pool.clone(), 10)
            .execute(
                b"AB12CDE,M1,Tesla,2019-03-04\nABCDEFGHIJ,,,2019-03-04",
                uploader_id,
                RegisterJobTrigger::RetrofitCsvFromS3,
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.inserted, 0);
        assert!(audit::find_by_modifier(&pool, &uploader_id.to_string()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_process_valid_file_keeps_duplicates_in_order() {
        let file = b"AB12CDE,M1,,2019-03-04\nAB12CDE,M2,,2019-03-04";

        match pipeline(lazy_pool(), 10).process(file) {
            ProcessedFile::Valid(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[1].vehicle_category.as_deref(), Some("M2"));
            },
            ProcessedFile::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
    }
}
