//! Register job routes
//!
//! - `POST /jobs` - start a job for an uploaded CSV file
//! - `GET /jobs/:job_name` - poll a job's status

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::commands::{start, StartRegisterJobCommand};
use super::queries::{get_status, GetRegisterJobStatusQuery};
use crate::error::AppError;
use crate::features::FeatureState;
use crate::middleware::CORRELATION_ID_HEADER;

pub fn register_jobs_routes() -> Router<FeatureState> {
    Router::new()
        .route("/jobs", post(start_register_job))
        .route("/jobs/:job_name", get(get_register_job_status))
}

/// Start a register job
///
/// # Response
///
/// - `201 Created` - `{"jobName": "..."}`
/// - `400 Bad Request` - missing fields, header or uploader id
/// - `404 Not Found` - file or bucket not found
/// - `406 Not Acceptable` - previous job for the same register still active
async fn start_register_job(
    State(state): State<FeatureState>,
    headers: HeaderMap,
    Json(mut command): Json<StartRegisterJobCommand>,
) -> Result<Response, AppError> {
    command.correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = start::handle(
        &state.supervisor,
        state.source.as_ref(),
        state.dispatcher.as_ref(),
        command,
    )
    .await?;

    tracing::info!(job_name = %response.job_name, "Register job started via API");

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Get a register job's status
async fn get_register_job_status(
    State(state): State<FeatureState>,
    Path(job_name): Path<String>,
) -> Result<Response, AppError> {
    let query = GetRegisterJobStatusQuery { job_name };

    let response = get_status::handle(&state.supervisor, query).await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}
