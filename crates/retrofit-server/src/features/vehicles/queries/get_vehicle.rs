//! Get vehicle query
//!
//! Looks a VRN up in the retrofit register.

use mediator::Request;
use retrofit_common::types::RegisterJobTrigger;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::DbError;
use crate::ingest::{repository, VehicleRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetVehicleQuery {
    pub vrn: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetVehicleError {
    #[error("Vehicle '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DbError),
}

impl Request<Result<VehicleRecord, GetVehicleError>> for GetVehicleQuery {}

pub async fn handle(pool: PgPool, query: GetVehicleQuery) -> Result<VehicleRecord, GetVehicleError> {
    let vrn: String = query.vrn.chars().filter(|c| !c.is_whitespace()).collect();

    repository::find_by_vrn(&pool, RegisterJobTrigger::RetrofitCsvFromS3, &vrn)
        .await?
        .ok_or(GetVehicleError::NotFound(vrn))
}
