//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;
use crate::jobs::SupervisorError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

impl From<SupervisorError> for AppError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::Database(DbError::NotFound(message)) => Self::NotFound(message),
            SupervisorError::Database(DbError::Duplicate(message)) => Self::Conflict(message),
            SupervisorError::Database(e) => Self::Database(e),
            e @ SupervisorError::InvalidTransition { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "A database error occurred".to_string())
            },
            AppError::NotFound(ref message) => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Validation(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::BadRequest(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotAcceptable(ref message) => (StatusCode::NOT_ACCEPTABLE, message.clone()),
            AppError::Conflict(ref message) => (StatusCode::CONFLICT, message.clone()),
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            },
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_acceptable_body() {
        let response =
            AppError::NotAcceptable("Previous job has not been finished yet".into()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(
            body_json(response).await,
            json!({"error": {"message": "Previous job has not been finished yet", "status": 406}})
        );
    }

    #[tokio::test]
    async fn test_database_details_are_hidden() {
        let response = AppError::Database(DbError::config("secret host")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "A database error occurred");
    }

    #[test]
    fn test_supervisor_errors() {
        let not_found: AppError =
            SupervisorError::Database(DbError::not_found("Register job", "x")).into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let duplicate: AppError = SupervisorError::Database(DbError::duplicate("Register job", "x")).into();
        assert!(matches!(duplicate, AppError::Conflict(_)));

        let transition: AppError = SupervisorError::InvalidTransition {
            job_id: Uuid::nil(),
            to: retrofit_common::types::RegisterJobStatus::Running,
        }
        .into();
        assert!(matches!(transition, AppError::Internal(_)));
    }
}
