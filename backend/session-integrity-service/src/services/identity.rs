//! Identity lookup collaborator
//!
//! Display names are snapshotted onto records at action time rather than
//! joined live, so downstream readers never depend on the identity service.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn display_name(&self, user_id: Uuid) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UserProfileResponse {
    display_name: String,
}

/// HTTP client for the platform identity service.
pub struct HttpIdentityClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
        }
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn display_name(&self, user_id: Uuid) -> Result<String> {
        let url = format!(
            "{}/internal/v1/users/{}",
            self.base_url.trim_end_matches('/'),
            user_id
        );

        let profile: UserProfileResponse = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Upstream(format!("Identity lookup failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Identity lookup failed: {e}")))?;

        Ok(profile.display_name)
    }
}
