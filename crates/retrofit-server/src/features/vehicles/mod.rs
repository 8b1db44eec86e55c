//! Vehicles feature module
//!
//! Read-only lookup of retrofitted vehicles and their change history.

pub mod queries;
pub mod routes;

pub use routes::vehicles_routes;
