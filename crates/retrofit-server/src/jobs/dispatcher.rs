//! Background execution of register jobs
//!
//! Dispatch is fire-and-forget and at-most-once: a job that panics, times out, or is lost with the
//! process is never retried. Lost jobs are failed on the next startup by
//! [`RegisterJobSupervisor::recover_stale_jobs`](crate::jobs::RegisterJobSupervisor::recover_stale_jobs).

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::ingest::SourceLocator;

/// A started job waiting to be run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub job_id: Uuid,
    pub job_name: String,
    pub locator: SourceLocator,
    pub correlation_id: String,
}

pub trait JobDispatcher: Send + Sync {
    /// Schedule `request` and return without waiting for it
    fn dispatch(&self, request: DispatchRequest);
}

/// Work done for a dispatched job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, request: DispatchRequest);

    /// Called when `run` panicked or overran its time limit
    async fn abandon(&self, job_id: Uuid);
}

/// Runs each job on its own tokio task with a time limit
#[derive(Clone)]
pub struct TokioJobDispatcher {
    handler: Arc<dyn JobHandler>,
    timeout: Duration,
}

impl TokioJobDispatcher {
    pub fn new(handler: Arc<dyn JobHandler>, timeout: Duration) -> Self {
        Self { handler, timeout }
    }
}

impl JobDispatcher for TokioJobDispatcher {
    fn dispatch(&self, request: DispatchRequest) {
        let handler = Arc::clone(&self.handler);
        let timeout = self.timeout;
        let job_id = request.job_id;
        let span = info_span!(
            "register_job",
            %job_id,
            job_name = %request.job_name,
            correlation_id = %request.correlation_id
        );

        tokio::spawn(
            async move {
                let run = tokio::spawn({
                    let handler = Arc::clone(&handler);
                    async move { handler.run(request).await }.in_current_span()
                });
                let abort = run.abort_handle();

                match tokio::time::timeout(timeout, run).await {
                    Ok(Ok(())) => {},
                    Ok(Err(join_error)) => {
                        error!(error = %join_error, "Register job panicked");
                        handler.abandon(job_id).await;
                    },
                    Err(_) => {
                        abort.abort();
                        warn!(timeout_secs = timeout.as_secs(), "Register job timed out");
                        handler.abandon(job_id).await;
                    },
                }
            }
            .instrument(span),
        );
    }
}
