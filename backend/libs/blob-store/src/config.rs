/// Blob store configuration shared across services
use serde::{Deserialize, Serialize};

use crate::BlobStoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Base URL for public access (CDN domain)
    pub base_url: String,
}

impl BlobStoreConfig {
    /// Load blob store configuration from environment variables
    pub fn from_env() -> Result<Self, BlobStoreError> {
        Ok(Self {
            bucket: std::env::var("BLOB_BUCKET")
                .unwrap_or_else(|_| "tutorlink-evidence".to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            base_url: std::env::var("BLOB_BASE_URL")
                .unwrap_or_else(|_| "https://cdn.tutorlink.io".to_string()),
        })
    }

    /// Public URL for a stored object
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
