//! Retrofit Register Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the retrofit register workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`RetrofitError`] and the crate [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//! - **Types**: register job triggers, statuses and CSV content categories
//!
//! # Example
//!
//! ```no_run
//! use retrofit_common::types::{CsvContentType, RegisterJobTrigger};
//!
//! fn trigger_for(metadata_value: &str) -> retrofit_common::Result<RegisterJobTrigger> {
//!     let content_type: CsvContentType = metadata_value.parse()?;
//!     Ok(RegisterJobTrigger::from(content_type))
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, RetrofitError};
