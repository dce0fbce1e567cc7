//! Notification dispatcher collaborator
//!
//! Delivery is fire-and-forget: state changes must never fail because the
//! notification service is down.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, user_id: Uuid, event: &str, payload: serde_json::Value) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct NotificationRequest<'a> {
    user_id: Uuid,
    event: &'a str,
    payload: serde_json::Value,
}

/// HTTP client for the platform notification service.
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
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
impl Notifier for HttpNotifier {
    async fn dispatch(&self, user_id: Uuid, event: &str, payload: serde_json::Value) -> Result<()> {
        let url = format!(
            "{}/internal/v1/notifications",
            self.base_url.trim_end_matches('/')
        );

        self.client
            .post(&url)
            .json(&NotificationRequest {
                user_id,
                event,
                payload,
            })
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::Upstream(format!("Notification dispatch failed: {e}")))?;

        Ok(())
    }
}

/// Dispatch a notification without awaiting or propagating the outcome.
pub fn notify_best_effort(
    notifier: &Arc<dyn Notifier>,
    user_id: Uuid,
    event: &'static str,
    payload: serde_json::Value,
) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.dispatch(user_id, event, payload).await {
            tracing::warn!(%user_id, event, error = %e, "Notification dispatch failed");
        }
    });
}
