//! Domain types shared by the register server and its tooling

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::RetrofitError;

// ============================================================================
// CSV Content Types
// ============================================================================

/// Business classification of an uploaded CSV file.
///
/// Read from the `csv-content-type` metadata of the uploaded object. The value
/// decides which active-job slot is checked and which table is reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CsvContentType {
    RetrofitList,
    ModGreenList,
    ModWhiteList,
}

impl CsvContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrofitList => "RETROFIT_LIST",
            Self::ModGreenList => "MOD_GREEN_LIST",
            Self::ModWhiteList => "MOD_WHITE_LIST",
        }
    }
}

impl FromStr for CsvContentType {
    type Err = RetrofitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RETROFIT_LIST" => Ok(Self::RetrofitList),
            "MOD_GREEN_LIST" => Ok(Self::ModGreenList),
            "MOD_WHITE_LIST" => Ok(Self::ModWhiteList),
            _ => Err(RetrofitError::InvalidContentType(s.to_string())),
        }
    }
}

impl std::fmt::Display for CsvContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Register Job Triggers
// ============================================================================

/// What started a register job. One active job is allowed per trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterJobTrigger {
    RetrofitCsvFromS3,
    GreenModCsvFromS3,
    WhiteModCsvFromS3,
}

impl RegisterJobTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrofitCsvFromS3 => "RETROFIT_CSV_FROM_S3",
            Self::GreenModCsvFromS3 => "GREEN_MOD_CSV_FROM_S3",
            Self::WhiteModCsvFromS3 => "WHITE_MOD_CSV_FROM_S3",
        }
    }
}

impl From<CsvContentType> for RegisterJobTrigger {
    fn from(content_type: CsvContentType) -> Self {
        match content_type {
            CsvContentType::RetrofitList => Self::RetrofitCsvFromS3,
            CsvContentType::ModGreenList => Self::GreenModCsvFromS3,
            CsvContentType::ModWhiteList => Self::WhiteModCsvFromS3,
        }
    }
}

impl FromStr for RegisterJobTrigger {
    type Err = RetrofitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RETROFIT_CSV_FROM_S3" => Ok(Self::RetrofitCsvFromS3),
            "GREEN_MOD_CSV_FROM_S3" => Ok(Self::GreenModCsvFromS3),
            "WHITE_MOD_CSV_FROM_S3" => Ok(Self::WhiteModCsvFromS3),
            _ => Err(RetrofitError::InvalidTrigger(s.to_string())),
        }
    }
}

impl std::fmt::Display for RegisterJobTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Register Job Status
// ============================================================================

/// Fine-grained register job state.
///
/// ```text
/// STARTING ──> RUNNING ──> FINISHED_SUCCESS
///    │            ├──────> FINISHED_FAILURE_VALIDATION_ERRORS
///    │            └──────> UNKNOWN_FAILURE
///    ├──> STARTUP_FAILURE_*
///    └──> UNKNOWN_FAILURE
/// ```
///
/// Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterJobStatus {
    Starting,
    #[serde(rename = "STARTUP_FAILURE_NO_S3_BUCKET_OR_FILE")]
    StartupFailureNoS3BucketOrFile,
    #[serde(rename = "STARTUP_FAILURE_NO_ACCESS_TO_S3")]
    StartupFailureNoAccessToS3,
    StartupFailureNoUploaderId,
    StartupFailureInvalidUploaderId,
    StartupFailureTooLargeFile,
    Running,
    FinishedSuccess,
    FinishedFailureValidationErrors,
    UnknownFailure,
}

impl RegisterJobStatus {
    /// Statuses that occupy a trigger's active-job slot
    pub const ACTIVE: [RegisterJobStatus; 2] = [Self::Starting, Self::Running];

    pub const ALL: [RegisterJobStatus; 10] = [
        Self::Starting,
        Self::StartupFailureNoS3BucketOrFile,
        Self::StartupFailureNoAccessToS3,
        Self::StartupFailureNoUploaderId,
        Self::StartupFailureInvalidUploaderId,
        Self::StartupFailureTooLargeFile,
        Self::Running,
        Self::FinishedSuccess,
        Self::FinishedFailureValidationErrors,
        Self::UnknownFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::StartupFailureNoS3BucketOrFile => "STARTUP_FAILURE_NO_S3_BUCKET_OR_FILE",
            Self::StartupFailureNoAccessToS3 => "STARTUP_FAILURE_NO_ACCESS_TO_S3",
            Self::StartupFailureNoUploaderId => "STARTUP_FAILURE_NO_UPLOADER_ID",
            Self::StartupFailureInvalidUploaderId => "STARTUP_FAILURE_INVALID_UPLOADER_ID",
            Self::StartupFailureTooLargeFile => "STARTUP_FAILURE_TOO_LARGE_FILE",
            Self::Running => "RUNNING",
            Self::FinishedSuccess => "FINISHED_SUCCESS",
            Self::FinishedFailureValidationErrors => "FINISHED_FAILURE_VALIDATION_ERRORS",
            Self::UnknownFailure => "UNKNOWN_FAILURE",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::StartupFailureNoS3BucketOrFile
                | Self::StartupFailureNoAccessToS3
                | Self::StartupFailureNoUploaderId
                | Self::StartupFailureInvalidUploaderId
                | Self::StartupFailureTooLargeFile
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: RegisterJobStatus) -> bool {
        match self {
            Self::Starting => {
                next == Self::Running || next == Self::UnknownFailure || next.is_startup_failure()
            },
            Self::Running => matches!(
                next,
                Self::FinishedSuccess | Self::FinishedFailureValidationErrors | Self::UnknownFailure
            ),
            _ => false,
        }
    }
}

impl FromStr for RegisterJobStatus {
    type Err = RetrofitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STARTING" => Ok(Self::Starting),
            "STARTUP_FAILURE_NO_S3_BUCKET_OR_FILE" => Ok(Self::StartupFailureNoS3BucketOrFile),
            "STARTUP_FAILURE_NO_ACCESS_TO_S3" => Ok(Self::StartupFailureNoAccessToS3),
            "STARTUP_FAILURE_NO_UPLOADER_ID" => Ok(Self::StartupFailureNoUploaderId),
            "STARTUP_FAILURE_INVALID_UPLOADER_ID" => Ok(Self::StartupFailureInvalidUploaderId),
            "STARTUP_FAILURE_TOO_LARGE_FILE" => Ok(Self::StartupFailureTooLargeFile),
            "RUNNING" => Ok(Self::Running),
            "FINISHED_SUCCESS" => Ok(Self::FinishedSuccess),
            "FINISHED_FAILURE_VALIDATION_ERRORS" => Ok(Self::FinishedFailureValidationErrors),
            "UNKNOWN_FAILURE" => Ok(Self::UnknownFailure),
            _ => Err(RetrofitError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for RegisterJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse status exposed to pollers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterJobStatusSummary {
    Running,
    Success,
    Failure,
}

impl From<RegisterJobStatus> for RegisterJobStatusSummary {
    fn from(status: RegisterJobStatus) -> Self {
        match status {
            RegisterJobStatus::Starting | RegisterJobStatus::Running => Self::Running,
            RegisterJobStatus::FinishedSuccess => Self::Success,
            _ => Self::Failure,
        }
    }
}
