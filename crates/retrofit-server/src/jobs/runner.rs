use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use retrofit_common::types::RegisterJobStatus;

use crate::ingest::{CsvIngestionPipeline, FileSource, PipelineError};
use crate::jobs::dispatcher::{DispatchRequest, JobHandler};
use crate::jobs::supervisor::{RegisterJobSupervisor, SupervisorError};

#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Runs one register job: fetch the file, ingest it, report the outcome
pub struct RegisterJobRunner {
    supervisor: RegisterJobSupervisor,
    source: Arc<dyn FileSource>,
    pipeline: Arc<CsvIngestionPipeline>,
}

impl RegisterJobRunner {
    pub fn new(
        supervisor: RegisterJobSupervisor,
        source: Arc<dyn FileSource>,
        pipeline: Arc<CsvIngestionPipeline>,
    ) -> Self {
        Self {
            supervisor,
            source,
            pipeline,
        }
    }

    async fn try_run(&self, request: &DispatchRequest) -> Result<(), RunError> {
        let job = self.supervisor.find_job(request.job_id).await?;

        let file = match self.source.fetch(&request.locator).await {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, locator = %request.locator, "Could not fetch register file");
                let status = e.startup_status();
                if status == RegisterJobStatus::UnknownFailure {
                    self.supervisor.mark_unknown_failure(job.id).await?;
                } else {
                    self.supervisor
                        .mark_startup_failure(job.id, status, &[e.to_validation_error()])
                        .await?;
                }
                return Ok(());
            },
        };

        self.supervisor.mark_running(job.id).await?;

        // The job row, not the re-read metadata, decides the register and the modifier
        let result = self
            .pipeline
            .execute(&file.bytes, job.uploader_id, job.trigger, job.id)
            .await?;

        if result.is_success() {
            info!(
                inserted = result.inserted,
                updated = result.updated,
                deleted = result.deleted,
                "Register job finished"
            );
            self.supervisor.mark_finished_success(job.id).await?;
        } else {
            info!(errors = result.errors.len(), "Register job finished with validation errors");
            self.supervisor
                .mark_finished_validation_errors(job.id, &result.errors)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl JobHandler for RegisterJobRunner {
    async fn run(&self, request: DispatchRequest) {
        if let Err(e) = self.try_run(&request).await {
            error!(error = %e, "Register job failed");
            self.abandon(request.job_id).await;
        }
    }

    async fn abandon(&self, job_id: Uuid) {
        match self.supervisor.mark_unknown_failure(job_id).await {
            Ok(()) => {},
            Err(SupervisorError::InvalidTransition { .. }) => {},
            Err(e) => error!(%job_id, error = %e, "Could not mark register job as failed"),
        }
    }
}
