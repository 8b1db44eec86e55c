//! Test helpers for register server integration tests
//!
//! - An in-memory [`FileSource`] standing in for S3
//! - Wiring of supervisor, runner and dispatcher around a test pool
//! - Polling until a job reaches a terminal status
#![allow(dead_code)]

use async_trait::async_trait;
use retrofit_server::{
    config::RegisterConfig,
    features::FeatureState,
    ingest::{
        source::{CONTENT_TYPE_METADATA_KEY, UPLOADER_ID_METADATA_KEY},
        CsvIngestionPipeline, FileSource, SourceError, SourceFile, SourceLocator, SourceMetadata,
    },
    jobs::{RegisterJob, RegisterJobRunner, RegisterJobSupervisor, TokioJobDispatcher},
};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const UPLOADER_ID: &str = "6f3a1c0e-2b7d-4e58-9a41-0d5c8e7f3b21";

struct StoredObject {
    bytes: Vec<u8>,
    metadata: HashMap<String, String>,
}

/// Objects keyed by bucket and filename
#[derive(Default)]
pub struct InMemoryFileSource {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    max_file_size_bytes: Option<u64>,
}

impl InMemoryFileSource {
    pub fn with_max_file_size(max_file_size_bytes: u64) -> Self {
        Self {
            max_file_size_bytes: Some(max_file_size_bytes),
            ..Default::default()
        }
    }

    pub fn put(&self, bucket: &str, filename: &str, bytes: &[u8], metadata: &[(&str, &str)]) {
        let metadata = metadata.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), filename.to_string()),
            StoredObject {
                bytes: bytes.to_vec(),
                metadata,
            },
        );
    }

    /// Upload a retrofit list by the default uploader
    pub fn put_retrofit_csv(&self, bucket: &str, filename: &str, csv: &str) {
        self.put(
            bucket,
            filename,
            csv.as_bytes(),
            &[(UPLOADER_ID_METADATA_KEY, UPLOADER_ID), (CONTENT_TYPE_METADATA_KEY, "retrofit_list")],
        );
    }

    pub fn remove(&self, bucket: &str, filename: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), filename.to_string()));
    }
}

#[async_trait]
impl FileSource for InMemoryFileSource {
    async fn metadata(&self, locator: &SourceLocator) -> Result<SourceMetadata, SourceError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(&(locator.s3_bucket.clone(), locator.filename.clone()))
            .ok_or(SourceError::NotFound)?;
        SourceMetadata::from_object_metadata(&object.metadata, object.bytes.len() as u64)
    }

    async fn fetch(&self, locator: &SourceLocator) -> Result<SourceFile, SourceError> {
        let metadata = self.metadata(locator).await?;
        if let Some(max) = self.max_file_size_bytes {
            if metadata.size > max {
                return Err(SourceError::TooLarge {
                    size: metadata.size,
                    max,
                });
            }
        }

        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(&(locator.s3_bucket.clone(), locator.filename.clone()))
            .ok_or(SourceError::NotFound)?;

        Ok(SourceFile {
            bytes: object.bytes.clone(),
            metadata,
        })
    }
}

pub fn register_config() -> RegisterConfig {
    RegisterConfig {
        max_errors_count: 10,
        job_timeout_secs: 30,
        ..Default::default()
    }
}

/// Feature state with a real supervisor, runner and tokio dispatcher over `source`
pub fn feature_state(pool: PgPool, source: Arc<dyn FileSource>) -> FeatureState {
    let config = register_config();
    let supervisor = RegisterJobSupervisor::new(pool.clone(), config.max_errors_count);
    let pipeline = Arc::new(CsvIngestionPipeline::new(pool.clone(), &config).unwrap());
    let runner = RegisterJobRunner::new(supervisor.clone(), Arc::clone(&source), pipeline);
    let dispatcher = Arc::new(TokioJobDispatcher::new(Arc::new(runner), config.job_timeout()));

    FeatureState {
        db: pool,
        supervisor,
        source,
        dispatcher,
    }
}

/// Poll until the job leaves `STARTING`/`RUNNING`
pub async fn wait_for_terminal(supervisor: &RegisterJobSupervisor, job_name: &str) -> RegisterJob {
    for _ in 0..200 {
        let job = supervisor.find_job_with_name(job_name).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_name} did not finish");
}

pub fn uploader_id() -> Uuid {
    Uuid::parse_str(UPLOADER_ID).unwrap()
}
