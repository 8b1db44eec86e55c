//! Where register CSV files come from
//!
//! A [`FileSource`] resolves a [`SourceLocator`] into the file's bytes plus the metadata the
//! uploader attached: who uploaded it and which register it is meant for. Each way of failing
//! maps onto one startup failure status of the register job.

use async_trait::async_trait;
use retrofit_common::types::{CsvContentType, RegisterJobStatus, RegisterJobTrigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::ingest::validation::ValidationError;
use crate::storage::{Storage, StorageError};

pub const UPLOADER_ID_METADATA_KEY: &str = "uploader-id";
pub const CONTENT_TYPE_METADATA_KEY: &str = "csv-content-type";

/// Bucket and object key of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocator {
    pub s3_bucket: String,
    pub filename: String,
}

impl SourceLocator {
    pub fn new(s3_bucket: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            s3_bucket: s3_bucket.into(),
            filename: filename.into(),
        }
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.s3_bucket, self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    pub uploader_id: Uuid,
    pub content_type: CsvContentType,
    pub size: u64,
}

impl SourceMetadata {
    /// Read the uploader id and content type out of object user metadata.
    /// A missing content type means the retrofit list.
    pub fn from_object_metadata(
        metadata: &HashMap<String, String>,
        size: u64,
    ) -> Result<Self, SourceError> {
        let uploader_id = metadata
            .get(UPLOADER_ID_METADATA_KEY)
            .ok_or(SourceError::MissingUploaderId)?;
        let uploader_id = Uuid::parse_str(uploader_id.trim())
            .map_err(|_| SourceError::InvalidUploaderId(uploader_id.clone()))?;

        let content_type = match metadata.get(CONTENT_TYPE_METADATA_KEY) {
            Some(value) => value
                .parse()
                .map_err(|_| SourceError::InvalidContentType(value.clone()))?,
            None => CsvContentType::RetrofitList,
        };

        Ok(Self {
            uploader_id,
            content_type,
            size,
        })
    }

    pub fn trigger(&self) -> RegisterJobTrigger {
        RegisterJobTrigger::from(self.content_type)
    }
}

/// A fetched file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub bytes: Vec<u8>,
    pub metadata: SourceMetadata,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("S3 bucket or file not found or not accessible")]
    NotFound,

    #[error("Service does not have access to the S3 bucket or file")]
    AccessDenied,

    #[error("'uploader-id' not found in file's metadata")]
    MissingUploaderId,

    #[error("Malformed ID of an entity which want to register vehicles by CSV file. Expected a unique identifier (UUID)")]
    InvalidUploaderId(String),

    #[error("Uploaded file is too large. Maximum allowed: {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported 'csv-content-type' value: {0}")]
    InvalidContentType(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for SourceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => Self::NotFound,
            StorageError::AccessDenied { .. } => Self::AccessDenied,
            other => Self::Storage(other.to_string()),
        }
    }
}

impl SourceError {
    /// Terminal status of a job whose file could not be fetched
    pub fn startup_status(&self) -> RegisterJobStatus {
        match self {
            Self::NotFound => RegisterJobStatus::StartupFailureNoS3BucketOrFile,
            Self::AccessDenied => RegisterJobStatus::StartupFailureNoAccessToS3,
            Self::MissingUploaderId => RegisterJobStatus::StartupFailureNoUploaderId,
            Self::InvalidUploaderId(_) => RegisterJobStatus::StartupFailureInvalidUploaderId,
            Self::TooLarge { .. } => RegisterJobStatus::StartupFailureTooLargeFile,
            Self::InvalidContentType(_) | Self::Storage(_) => RegisterJobStatus::UnknownFailure,
        }
    }

    /// Error recorded on the job. Failures without a startup status stay opaque.
    pub fn to_validation_error(&self) -> ValidationError {
        match self.startup_status() {
            RegisterJobStatus::UnknownFailure => ValidationError::unknown(),
            _ => ValidationError::s3_error(self.to_string()),
        }
    }
}

#[async_trait]
pub trait FileSource: Send + Sync {
    /// Metadata only, without downloading the body
    async fn metadata(&self, locator: &SourceLocator) -> Result<SourceMetadata, SourceError>;

    /// Metadata and body. Fails with [`SourceError::TooLarge`] before downloading oversized files.
    async fn fetch(&self, locator: &SourceLocator) -> Result<SourceFile, SourceError>;
}

/// [`FileSource`] backed by S3
#[derive(Clone)]
pub struct S3FileSource {
    storage: Storage,
    max_file_size_bytes: u64,
}

impl S3FileSource {
    pub fn new(storage: Storage, max_file_size_bytes: u64) -> Self {
        Self {
            storage,
            max_file_size_bytes,
        }
    }
}

#[async_trait]
impl FileSource for S3FileSource {
    #[instrument(skip(self), fields(locator = %locator))]
    async fn metadata(&self, locator: &SourceLocator) -> Result<SourceMetadata, SourceError> {
        let head = self.storage.head(&locator.s3_bucket, &locator.filename).await?;
        SourceMetadata::from_object_metadata(&head.metadata, head.size)
    }

    #[instrument(skip(self), fields(locator = %locator))]
    async fn fetch(&self, locator: &SourceLocator) -> Result<SourceFile, SourceError> {
        let metadata = self.metadata(locator).await?;
        if metadata.size > self.max_file_size_bytes {
            return Err(SourceError::TooLarge {
                size: metadata.size,
                max: self.max_file_size_bytes,
            });
        }

        let bytes = self.storage.download(&locator.s3_bucket, &locator.filename).await?;

        Ok(SourceFile { bytes, metadata })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const UPLOADER: &str = "1b4f2b5e-8c56-4a0c-a3b5-3c1bbd0f7e4a";

    fn metadata(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_metadata_defaults_to_retrofit_list() {
        let parsed =
            SourceMetadata::from_object_metadata(&metadata(&[("uploader-id", UPLOADER)]), 42)
                .unwrap();

        assert_eq!(parsed.uploader_id, Uuid::parse_str(UPLOADER).unwrap());
        assert_eq!(parsed.content_type, CsvContentType::RetrofitList);
        assert_eq!(parsed.trigger(), RegisterJobTrigger::RetrofitCsvFromS3);
        assert_eq!(parsed.size, 42);
    }

    #[test]
    fn test_metadata_content_type_selects_trigger() {
        let parsed = SourceMetadata::from_object_metadata(
            &metadata(&[("uploader-id", UPLOADER), ("csv-content-type", "MOD_GREEN_LIST")]),
            1,
        )
        .unwrap();

        assert_eq!(parsed.trigger(), RegisterJobTrigger::GreenModCsvFromS3);
    }

    #[test]
    fn test_metadata_errors() {
        let missing = SourceMetadata::from_object_metadata(&metadata(&[]), 1).unwrap_err();
        assert!(matches!(missing, SourceError::MissingUploaderId));

        let invalid =
            SourceMetadata::from_object_metadata(&metadata(&[("uploader-id", "bob")]), 1)
                .unwrap_err();
        assert!(matches!(invalid, SourceError::InvalidUploaderId(_)));

        let content_type = SourceMetadata::from_object_metadata(
            &metadata(&[("uploader-id", UPLOADER), ("csv-content-type", "fleet")]),
            1,
        )
        .unwrap_err();
        assert!(matches!(content_type, SourceError::InvalidContentType(_)));
    }

    #[test]
    fn test_startup_status_mapping() {
        assert_eq!(
            SourceError::NotFound.startup_status(),
            RegisterJobStatus::StartupFailureNoS3BucketOrFile
        );
        assert_eq!(
            SourceError::AccessDenied.startup_status(),
            RegisterJobStatus::StartupFailureNoAccessToS3
        );
        assert_eq!(
            SourceError::MissingUploaderId.startup_status(),
            RegisterJobStatus::StartupFailureNoUploaderId
        );
        assert_eq!(
            SourceError::InvalidUploaderId("x".into()).startup_status(),
            RegisterJobStatus::StartupFailureInvalidUploaderId
        );
        assert_eq!(
            SourceError::TooLarge { size: 2, max: 1 }.startup_status(),
            RegisterJobStatus::StartupFailureTooLargeFile
        );
        assert_eq!(
            SourceError::Storage("timeout".into()).startup_status(),
            RegisterJobStatus::UnknownFailure
        );
    }

    #[test]
    fn test_startup_errors_are_s3_errors() {
        let error = SourceError::TooLarge {
            size: 200,
            max: 100,
        }
        .to_validation_error();

        assert_eq!(error.title(), "S3 error");
        assert_eq!(error.detail(), "Uploaded file is too large. Maximum allowed: 100 bytes");
        assert_eq!(
            SourceError::MissingUploaderId.to_validation_error().detail(),
            "'uploader-id' not found in file's metadata"
        );
    }

    #[test]
    fn test_unexpected_errors_stay_opaque() {
        let error = SourceError::Storage("connection reset by peer".into()).to_validation_error();

        assert_eq!(error.title(), "Unknown error");
        assert!(!error.detail().contains("connection reset"));
    }
}
