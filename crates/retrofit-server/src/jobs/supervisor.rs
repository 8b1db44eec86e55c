//! Register job lifecycle
//!
//! [`RegisterJobSupervisor`] owns the job table. HTTP handlers use it to start jobs and read their
//! status; the job runner uses the `mark_*` entry points to report progress.

use chrono::Utc;
use retrofit_common::types::{RegisterJobStatus, RegisterJobTrigger};
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbError;
use crate::ingest::ValidationError;
use crate::jobs::dispatcher::{DispatchRequest, JobDispatcher};
use crate::jobs::models::{RegisterJob, RegisterJobError, StartParams};
use crate::jobs::name::job_name;
use crate::jobs::repository::{self, NewRegisterJob};

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Register job {job_id} cannot move to {to}")]
    InvalidTransition { job_id: Uuid, to: RegisterJobStatus },
}

impl From<sqlx::Error> for SupervisorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

#[derive(Clone)]
pub struct RegisterJobSupervisor {
    pool: PgPool,
    max_errors_count: usize,
}

impl RegisterJobSupervisor {
    pub fn new(pool: PgPool, max_errors_count: usize) -> Self {
        Self {
            pool,
            max_errors_count,
        }
    }

    /// Persist a `STARTING` job and hand it to `dispatcher`. Returns the job name immediately.
    #[instrument(skip(self, params, dispatcher), fields(locator = %params.locator, trigger = %params.trigger))]
    pub async fn start(
        &self,
        params: StartParams,
        dispatcher: &dyn JobDispatcher,
    ) -> SupervisorResult<String> {
        let job = NewRegisterJob {
            id: Uuid::new_v4(),
            job_name: job_name(Utc::now(), params.trigger, &params.locator.filename),
            uploader_id: params.uploader_id,
            trigger: params.trigger,
            correlation_id: params.correlation_id,
        };

        repository::insert(&self.pool, &job).await?;
        info!(job_id = %job.id, job_name = %job.job_name, "Register job created");

        dispatcher.dispatch(DispatchRequest {
            job_id: job.id,
            job_name: job.job_name.clone(),
            locator: params.locator,
            correlation_id: job.correlation_id,
        });

        Ok(job.job_name)
    }

    pub async fn find_job_with_name(&self, job_name: &str) -> SupervisorResult<RegisterJob> {
        repository::find_by_name(&self.pool, job_name)
            .await?
            .ok_or_else(|| DbError::not_found("Register job", job_name).into())
    }

    pub async fn find_job(&self, job_id: Uuid) -> SupervisorResult<RegisterJob> {
        repository::find_by_id(&self.pool, job_id)
            .await?
            .ok_or_else(|| DbError::not_found("Register job", &job_id.to_string()).into())
    }

    /// Best-effort check; two concurrent starts may both see `false`.
    pub async fn has_active_jobs_for(&self, trigger: RegisterJobTrigger) -> SupervisorResult<bool> {
        Ok(repository::has_active_jobs(&self.pool, trigger).await?)
    }

    pub async fn mark_running(&self, job_id: Uuid) -> SupervisorResult<()> {
        self.transition(job_id, RegisterJobStatus::Running, &[]).await
    }

    pub async fn mark_finished_success(&self, job_id: Uuid) -> SupervisorResult<()> {
        self.transition(job_id, RegisterJobStatus::FinishedSuccess, &[]).await
    }

    pub async fn mark_finished_validation_errors(
        &self,
        job_id: Uuid,
        errors: &[ValidationError],
    ) -> SupervisorResult<()> {
        self.transition(job_id, RegisterJobStatus::FinishedFailureValidationErrors, errors)
            .await
    }

    /// `status` must be one of the `STARTUP_FAILURE_*` statuses
    pub async fn mark_startup_failure(
        &self,
        job_id: Uuid,
        status: RegisterJobStatus,
        errors: &[ValidationError],
    ) -> SupervisorResult<()> {
        if !status.is_startup_failure() {
            return Err(SupervisorError::InvalidTransition { job_id, to: status });
        }
        self.transition(job_id, status, errors).await
    }

    pub async fn mark_unknown_failure(&self, job_id: Uuid) -> SupervisorResult<()> {
        self.transition(job_id, RegisterJobStatus::UnknownFailure, &[ValidationError::unknown()])
            .await
    }

    /// Fail jobs left active by a previous process. Returns how many were failed.
    #[instrument(skip(self))]
    pub async fn recover_stale_jobs(&self, older_than: Duration) -> SupervisorResult<usize> {
        let age = chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero());
        let stale = repository::find_stale(&self.pool, Utc::now() - age).await?;

        let mut recovered = 0;
        for job_id in stale {
            match self.mark_unknown_failure(job_id).await {
                Ok(()) => recovered += 1,
                Err(SupervisorError::InvalidTransition { .. }) => {},
                Err(e) => return Err(e),
            }
        }

        if recovered > 0 {
            warn!(recovered, "Failed stale register jobs");
        }
        Ok(recovered)
    }

    async fn transition(
        &self,
        job_id: Uuid,
        to: RegisterJobStatus,
        errors: &[ValidationError],
    ) -> SupervisorResult<()> {
        let errors: Vec<RegisterJobError> =
            errors.iter().take(self.max_errors_count).map(RegisterJobError::from).collect();

        if repository::update_status(&self.pool, job_id, to, &errors).await? {
            info!(%job_id, status = %to, errors = errors.len(), "Register job status changed");
            Ok(())
        } else {
            warn!(%job_id, status = %to, "Rejected register job status change");
            Err(SupervisorError::InvalidTransition { job_id, to })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ingest::SourceLocator;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        requests: Mutex<Vec<DispatchRequest>>,
    }

    impl JobDispatcher for RecordingDispatcher {
        fn dispatch(&self, request: DispatchRequest) {
            self.requests.lock().unwrap().push(request);
        }
    }

    fn params(filename: &str) -> StartParams {
        StartParams {
            locator: SourceLocator::new("bucket", filename),
            uploader_id: Uuid::new_v4(),
            trigger: RegisterJobTrigger::RetrofitCsvFromS3,
            correlation_id: "corr-7".to_string(),
        }
    }

    #[sqlx::test]
    async fn test_start_persists_and_dispatches(pool: PgPool) -> sqlx::Result<()> {
        let supervisor = RegisterJobSupervisor::new(pool, 10);
        let dispatcher = RecordingDispatcher::default();

        let name = supervisor.start(params("fleet.csv"), &dispatcher).await.unwrap();

        assert!(name.ends_with("_RETROFIT_CSV_FROM_S3_fleet"));
        let job = supervisor.find_job_with_name(&name).await.unwrap();
        assert_eq!(job.status, RegisterJobStatus::Starting);
        assert_eq!(job.correlation_id, "corr-7");

        let requests = dispatcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].job_id, job.id);
        assert_eq!(requests[0].locator.filename, "fleet.csv");
        Ok(())
    }

    #[sqlx::test]
    async fn test_find_missing_job(pool: PgPool) -> sqlx::Result<()> {
        let supervisor = RegisterJobSupervisor::new(pool, 10);

        let err = supervisor.find_job_with_name("nope").await.unwrap_err();

        assert!(matches!(err, SupervisorError::Database(DbError::NotFound(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn test_lifecycle_and_error_cap(pool: PgPool) -> sqlx::Result<()> {
        let supervisor = RegisterJobSupervisor::new(pool, 2);
        let name = supervisor
            .start(params("a.csv"), &RecordingDispatcher::default())
            .await
            .unwrap();
        let job = supervisor.find_job_with_name(&name).await.unwrap();

        assert!(supervisor.has_active_jobs_for(job.trigger).await.unwrap());
        supervisor.mark_running(job.id).await.unwrap();

        let errors: Vec<_> = (1..=4)
            .map(|line| ValidationError::value_error(None, "bad").at_line(line))
            .collect();
        supervisor.mark_finished_validation_errors(job.id, &errors).await.unwrap();

        let job = supervisor.find_job(job.id).await.unwrap();
        assert_eq!(job.status, RegisterJobStatus::FinishedFailureValidationErrors);
        assert_eq!(job.errors.len(), 2);
        assert!(!supervisor.has_active_jobs_for(job.trigger).await.unwrap());

        let err = supervisor.mark_unknown_failure(job.id).await.unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidTransition { .. }));
        Ok(())
    }

    #[sqlx::test]
    async fn test_startup_failure_requires_startup_status(pool: PgPool) -> sqlx::Result<()> {
        let supervisor = RegisterJobSupervisor::new(pool, 10);
        let name = supervisor
            .start(params("b.csv"), &RecordingDispatcher::default())
            .await
            .unwrap();
        let job = supervisor.find_job_with_name(&name).await.unwrap();

        let err = supervisor
            .mark_startup_failure(job.id, RegisterJobStatus::FinishedSuccess, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidTransition { .. }));

        supervisor
            .mark_startup_failure(
                job.id,
                RegisterJobStatus::StartupFailureNoUploaderId,
                &[ValidationError::s3_error("'uploader-id' not found in file's metadata")],
            )
            .await
            .unwrap();

        let job = supervisor.find_job(job.id).await.unwrap();
        assert_eq!(job.status, RegisterJobStatus::StartupFailureNoUploaderId);
        assert_eq!(job.errors[0].title, "S3 error");
        Ok(())
    }

    #[sqlx::test]
    async fn test_recover_stale_jobs(pool: PgPool) -> sqlx::Result<()> {
        let supervisor = RegisterJobSupervisor::new(pool, 10);
        let name = supervisor
            .start(params("c.csv"), &RecordingDispatcher::default())
            .await
            .unwrap();

        assert_eq!(supervisor.recover_stale_jobs(Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(supervisor.recover_stale_jobs(Duration::ZERO).await.unwrap(), 1);

        let job = supervisor.find_job_with_name(&name).await.unwrap();
        assert_eq!(job.status, RegisterJobStatus::UnknownFailure);
        assert_eq!(job.errors[0].detail, "Unknown error occurred while processing registration");
        Ok(())
    }
}
