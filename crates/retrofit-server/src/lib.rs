//! Retrofit Register Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Keeps registers of retrofitted and modified vehicles in sync with CSV files uploaded to S3.
//!
//! # Overview
//!
//! - **Register jobs**: one background job per uploaded file, tracked from `STARTING` to a
//!   terminal status
//! - **Ingestion**: CSV parsing, row validation, and reconciliation of the stored register
//! - **Audit**: every reconciling transaction records who uploaded the file
//! - **HTTP API**: starting jobs, polling their status, vehicle lookup and vehicle history
//!
//! # Flow
//!
//! ```text
//! POST /jobs -> metadata -> active job? -> STARTING -> dispatch
//!                                                        |
//!                      fetch -> RUNNING -> pipeline -> FINISHED_* / UNKNOWN_FAILURE
//! ```
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing
//! - **SQLx**: PostgreSQL access and migrations
//! - **Tower**: Middleware and service abstractions
//! - **AWS SDK**: S3 object metadata and downloads

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod jobs;
pub mod middleware;
pub mod storage;

pub use error::AppError;
