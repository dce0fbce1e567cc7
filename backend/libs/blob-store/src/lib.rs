//! S3-backed blob storage for evidence files
//!
//! Thin wrapper around the AWS S3 client: bytes in, public URL out. Callers
//! never see S3 types. Stored object names are collision-resistant so two
//! uploads of the same file name never overwrite each other.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod config;

pub use config::BlobStoreConfig;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Blob store configuration error: {0}")]
    Config(String),

    #[error("Blob upload failed for {key}: {message}")]
    Upload { key: String, message: String },
}

/// S3 client wrapper used by services to persist opaque blobs.
#[derive(Clone)]
pub struct BlobStore {
    client: Arc<Client>,
    config: BlobStoreConfig,
}

impl BlobStore {
    /// Create a new blob store with configuration from environment
    pub async fn new() -> Result<Self, BlobStoreError> {
        let config = BlobStoreConfig::from_env()?;
        Self::with_config(config).await
    }

    /// Create a new blob store with custom configuration
    pub async fn with_config(config: BlobStoreConfig) -> Result<Self, BlobStoreError> {
        let aws_config =
            aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
        let client = Client::new(&aws_config);

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Upload a blob under `folder`, returning the public URL.
    ///
    /// The stored key embeds a random component; the caller's file name is
    /// only kept as a sanitized suffix for human readability.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobStoreError> {
        let key = format!("{}/{}", folder, stored_object_name(file_name));

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| BlobStoreError::Upload {
                key: key.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(%key, bucket = %self.config.bucket, "Blob uploaded");

        Ok(self.config.object_url(&key))
    }

    /// Get blob store configuration
    pub fn config(&self) -> &BlobStoreConfig {
        &self.config
    }

    /// Health check for bucket connectivity
    pub async fn health_check(&self) -> Result<(), BlobStoreError> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| BlobStoreError::Upload {
                key: String::new(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// Collision-resistant stored name: `{uuid}-{sanitized original name}`.
pub fn stored_object_name(file_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(file_name))
}

/// Keep only characters that are safe in an object key; everything else
/// becomes `_`. Empty input falls back to `file`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
