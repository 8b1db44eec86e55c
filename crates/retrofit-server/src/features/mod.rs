//! Feature modules implementing the register API
//!
//! # Features
//!
//! - **register_jobs**: start CSV register jobs and poll their status
//! - **vehicles**: look up retrofitted vehicles and page through their history
//!
//! Each feature has `commands/` and/or `queries/` implementing `mediator::Request`, plus a
//! `routes.rs` wiring them to Axum handlers.

pub mod register_jobs;
pub mod vehicles;

use axum::Router;
use std::sync::Arc;

use crate::ingest::FileSource;
use crate::jobs::{JobDispatcher, RegisterJobSupervisor};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    pub supervisor: RegisterJobSupervisor,
    /// Where uploaded files and their metadata are read from
    pub source: Arc<dyn FileSource>,
    pub dispatcher: Arc<dyn JobDispatcher>,
}

/// Creates the API router with all feature routes mounted under `/v1/retrofit`
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest(
            "/v1/retrofit/register-csv-from-s3",
            register_jobs::register_jobs_routes().with_state(state.clone()),
        )
        .nest("/v1/retrofit/vehicles", vehicles::vehicles_routes().with_state(state.db.clone()))
}
