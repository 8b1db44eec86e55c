//! Vehicle routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use super::queries::{
    get_vehicle, history, GetVehicleError, GetVehicleHistoryError, GetVehicleHistoryQuery,
    GetVehicleQuery,
};
use crate::error::AppError;

pub fn vehicles_routes() -> Router<PgPool> {
    Router::new()
        .route("/:vrn", get(get_vehicle_by_vrn))
        .route("/:vrn/retrofit-info-historical", get(get_vehicle_history))
}

/// GET /vehicles/:vrn
async fn get_vehicle_by_vrn(
    State(pool): State<PgPool>,
    Path(vrn): Path<String>,
) -> Result<Response, AppError> {
    let record = get_vehicle::handle(pool, GetVehicleQuery { vrn }).await?;

    Ok((StatusCode::OK, Json(record)).into_response())
}

/// GET /vehicles/:vrn/retrofit-info-historical?startDate&endDate&pageNumber&pageSize
async fn get_vehicle_history(
    State(pool): State<PgPool>,
    Path(vrn): Path<String>,
    Query(mut query): Query<GetVehicleHistoryQuery>,
) -> Result<Response, AppError> {
    query.vrn = vrn;
    let response = history::handle(pool, query).await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

impl From<GetVehicleHistoryError> for AppError {
    fn from(err: GetVehicleHistoryError) -> Self {
        match err {
            GetVehicleHistoryError::Database(e) => AppError::Database(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<GetVehicleError> for AppError {
    fn from(err: GetVehicleError) -> Self {
        match err {
            GetVehicleError::NotFound(_) => AppError::NotFound(err.to_string()),
            GetVehicleError::Database(e) => AppError::Database(e),
        }
    }
}
