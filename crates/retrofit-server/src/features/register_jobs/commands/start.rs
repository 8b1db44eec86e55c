//! Start register job command
//!
//! Reads the uploaded file's metadata to attribute the job, refuses to start while the same
//! trigger still has an active job, then persists and dispatches a new job.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ingest::{FileSource, SourceError, SourceLocator};
use crate::jobs::{JobDispatcher, RegisterJobSupervisor, StartParams, SupervisorError};
use retrofit_common::types::RegisterJobTrigger;

pub const ACTIVE_JOB_MESSAGE: &str = "Previous job has not been finished yet";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRegisterJobCommand {
    pub s3_bucket: String,
    pub filename: String,

    /// Taken from the `X-Correlation-ID` header, never from the body
    #[serde(skip)]
    pub correlation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRegisterJobResponse {
    pub job_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StartRegisterJobError {
    #[error("'s3Bucket' is required")]
    BucketRequired,

    #[error("'filename' is required")]
    FilenameRequired,

    #[error("Missing X-Correlation-ID header")]
    CorrelationIdRequired,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Previous job has not been finished yet")]
    ActiveJob(RegisterJobTrigger),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl Request<Result<StartRegisterJobResponse, StartRegisterJobError>> for StartRegisterJobCommand {}

impl StartRegisterJobCommand {
    #[tracing::instrument(skip(self), fields(s3_bucket = %self.s3_bucket, filename = %self.filename))]
    pub fn validate(&self) -> Result<(), StartRegisterJobError> {
        if self.s3_bucket.trim().is_empty() {
            return Err(StartRegisterJobError::BucketRequired);
        }
        if self.filename.trim().is_empty() {
            return Err(StartRegisterJobError::FilenameRequired);
        }
        if self.correlation_id.trim().is_empty() {
            return Err(StartRegisterJobError::CorrelationIdRequired);
        }

        tracing::debug!("Command validation passed");
        Ok(())
    }
}

#[tracing::instrument(
    skip(supervisor, source, dispatcher, command),
    fields(s3_bucket = %command.s3_bucket, filename = %command.filename, correlation_id = %command.correlation_id)
)]
pub async fn handle(
    supervisor: &RegisterJobSupervisor,
    source: &dyn FileSource,
    dispatcher: &dyn JobDispatcher,
    command: StartRegisterJobCommand,
) -> Result<StartRegisterJobResponse, StartRegisterJobError> {
    command.validate()?;

    let locator = SourceLocator::new(command.s3_bucket, command.filename);
    let metadata = source.metadata(&locator).await?;
    let trigger = metadata.trigger();

    if supervisor.has_active_jobs_for(trigger).await? {
        tracing::info!(%trigger, "Rejected register job, previous job still active");
        return Err(StartRegisterJobError::ActiveJob(trigger));
    }

    let job_name = supervisor
        .start(
            StartParams {
                locator,
                uploader_id: metadata.uploader_id,
                trigger,
                correlation_id: command.correlation_id,
            },
            dispatcher,
        )
        .await?;

    Ok(StartRegisterJobResponse { job_name })
}

impl From<StartRegisterJobError> for AppError {
    fn from(err: StartRegisterJobError) -> Self {
        match err {
            StartRegisterJobError::BucketRequired
            | StartRegisterJobError::FilenameRequired
            | StartRegisterJobError::CorrelationIdRequired => AppError::Validation(err.to_string()),
            StartRegisterJobError::Source(
                SourceError::NotFound | SourceError::AccessDenied,
            ) => AppError::NotFound(err.to_string()),
            StartRegisterJobError::Source(
                SourceError::MissingUploaderId
                | SourceError::InvalidUploaderId(_)
                | SourceError::InvalidContentType(_)
                | SourceError::TooLarge { .. },
            ) => AppError::BadRequest(err.to_string()),
            StartRegisterJobError::Source(SourceError::Storage(message)) => {
                AppError::Internal(message)
            },
            StartRegisterJobError::ActiveJob(_) => AppError::NotAcceptable(err.to_string()),
            StartRegisterJobError::Supervisor(e) => e.into(),
        }
    }
}
