//! Read access to uploaded register files in S3-compatible storage

use aws_sdk_s3::{
    config::{http::HttpResponse, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    Client,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub mod config;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("Access to s3://{bucket}/{key} denied")]
    AccessDenied { bucket: String, key: String },

    #[error("S3 request for s3://{bucket}/{key} failed: {message}")]
    Request {
        bucket: String,
        key: String,
        message: String,
    },
}

impl StorageError {
    fn from_sdk<E>(bucket: &str, key: &str, err: SdkError<E, HttpResponse>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let (bucket, key) = (bucket.to_string(), key.to_string());
        match err.raw_response().map(|response| response.status().as_u16()) {
            Some(404) => Self::NotFound { bucket, key },
            Some(403) => Self::AccessDenied { bucket, key },
            _ => Self::Request {
                bucket,
                key,
                message: DisplayErrorContext(&err).to_string(),
            },
        }
    }
}

/// Size and user metadata of an object, without its body
#[derive(Debug, Clone, Default)]
pub struct ObjectHead {
    pub size: u64,
    /// User metadata with the `x-amz-meta-` prefix removed
    pub metadata: HashMap<String, String>,
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
}

impl Storage {
    pub fn new(config: config::StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "retrofit-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(region = %config.region, endpoint = ?config.endpoint, "Storage client initialized");

        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead, StorageError> {
        debug!("Getting metadata for s3://{}/{}", bucket, key);

        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(bucket, key, e))?;

        Ok(ObjectHead {
            size: response
                .content_length()
                .and_then(|length| u64::try_from(length).ok())
                .unwrap_or(0),
            metadata: response.metadata().cloned().unwrap_or_default(),
        })
    }

    #[instrument(skip(self))]
    pub async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        debug!("Downloading from s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::from_sdk(bucket, key, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Request {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: format!("Failed to read S3 response body: {}", e),
            })?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), bucket, key);

        Ok(data)
    }
}
