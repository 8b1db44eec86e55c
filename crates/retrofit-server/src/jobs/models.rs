use retrofit_common::types::{RegisterJobStatus, RegisterJobTrigger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::{SourceLocator, ValidationError};

/// A register job as stored in `t_register_job`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterJob {
    pub id: Uuid,
    pub job_name: String,
    pub uploader_id: Uuid,
    pub trigger: RegisterJobTrigger,
    pub status: RegisterJobStatus,
    pub correlation_id: String,
    pub errors: Vec<RegisterJobError>,
}

/// Error recorded against a job. Empty parts are left out of JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegisterJobError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl From<&ValidationError> for RegisterJobError {
    fn from(error: &ValidationError) -> Self {
        Self {
            subject_id: error.subject_id().map(str::to_string),
            title: error.title().to_string(),
            detail: error.detail(),
        }
    }
}

/// Everything needed to start a job for an uploaded file
#[derive(Debug, Clone)]
pub struct StartParams {
    pub locator: SourceLocator,
    pub uploader_id: Uuid,
    pub trigger: RegisterJobTrigger,
    pub correlation_id: String,
}
