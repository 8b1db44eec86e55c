//! Get register job status query

use mediator::Request;
use retrofit_common::types::RegisterJobStatusSummary;
use serde::{Deserialize, Serialize};

use crate::jobs::{RegisterJob, RegisterJobSupervisor, SupervisorError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRegisterJobStatusQuery {
    pub job_name: String,
}

/// Coarse status and error details of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterJobStatusResponse {
    pub status: RegisterJobStatusSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl From<RegisterJob> for RegisterJobStatusResponse {
    fn from(job: RegisterJob) -> Self {
        let errors: Vec<String> = job.errors.into_iter().map(|e| e.detail).collect();
        Self {
            status: job.status.into(),
            errors: (!errors.is_empty()).then_some(errors),
        }
    }
}

impl Request<Result<RegisterJobStatusResponse, SupervisorError>> for GetRegisterJobStatusQuery {}

pub async fn handle(
    supervisor: &RegisterJobSupervisor,
    query: GetRegisterJobStatusQuery,
) -> Result<RegisterJobStatusResponse, SupervisorError> {
    let job = supervisor.find_job_with_name(&query.job_name).await?;
    Ok(job.into())
}
