//! Recording lifecycle tracker
//!
//! Applies provider recording-status updates to a session's recording state
//! machine under the same per-class locking discipline as the participation
//! ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::classes;
use crate::error::{AppError, Result};
use crate::models::RecordingInfo;
use crate::services::presence::RoomRef;

pub struct RecordingService {
    pool: Arc<PgPool>,
}

impl RecordingService {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Apply one recording-status update. Transitions the current state does
    /// not permit are ignored, not errors.
    pub async fn apply_update(
        &self,
        room: &RoomRef,
        update: &RecordingInfo,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let class = classes::lock_class_by_room(&mut tx, &room.room_key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No class for room {}", room.room_key)))?;
        let mut session = classes::lock_session(&mut tx, class.id, room.session_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Session {} not found for class {}",
                    room.session_number, class.id
                ))
            })?;

        if session.apply_recording_event(update, at) {
            classes::update_session_state(&mut tx, &session).await?;
            tx.commit().await?;

            let status = session
                .recording
                .as_ref()
                .map(|r| r.status.as_str())
                .unwrap_or("none");
            info!(
                class_id = %class.id,
                session_number = session.session_number,
                recording_status = status,
                "Recording state advanced"
            );
        } else {
            tx.commit().await?;
            debug!(
                class_id = %class.id,
                session_number = session.session_number,
                "Ignored recording update with no legal transition"
            );
        }

        Ok(())
    }
}
