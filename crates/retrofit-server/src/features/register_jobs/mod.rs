//! Register jobs feature module
//!
//! Starting register jobs for uploaded CSV files and polling their status.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::register_jobs_routes;
