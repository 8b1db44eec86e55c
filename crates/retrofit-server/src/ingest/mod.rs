//! CSV ingestion of vehicle registers
//!
//! # Architecture
//!
//! - **csv**: file and line parsing into [`models::RawRow`]s
//! - **validation**: per-attribute row validators and structured errors
//! - **converter**: validated rows to [`models::VehicleRecord`]s
//! - **reconcile**: insert/update/delete delta against the stored register
//! - **repository**: register tables, one per trigger
//! - **source**: fetching uploaded files and their metadata
//! - **pipeline**: the above wired together for one register job

pub mod converter;
pub mod csv;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod repository;
pub mod source;
pub mod validation;

pub use converter::{ConversionResult, RowConverter};
pub use models::{RawRow, VehicleRecord, VehicleRow};
pub use pipeline::{CsvIngestionPipeline, PipelineError, PipelineResult};
pub use reconcile::{ReconciliationDelta, ReconciliationEngine};
pub use source::{FileSource, S3FileSource, SourceError, SourceFile, SourceLocator, SourceMetadata};
pub use validation::ValidationError;
