//! Session participation ledger
//!
//! Applies join/leave events to the per-session attendance aggregate and
//! drives the completion rule plus the class completion aggregator.
//!
//! Concurrent webhook deliveries for the same class must not race: every
//! mutation runs in one transaction that locks the class row first and the
//! session row second, so deliveries serialize per class.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::db::classes;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ClassRole, LearningClass};
use crate::services::notifier::{notify_best_effort, Notifier};
use crate::services::presence::RoomRef;

pub struct ParticipationService {
    pool: Arc<PgPool>,
    notifier: Arc<dyn Notifier>,
}

impl ParticipationService {
    pub fn new(pool: Arc<PgPool>, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    /// Apply a join event to one side of a session.
    pub async fn record_join(
        &self,
        room: &RoomRef,
        side: ClassRole,
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

        session.record_join(side, at);
        classes::update_session_state(&mut tx, &session).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Apply a leave event, then re-evaluate the completion rule and, when a
    /// session completes, the class completion aggregator — all in the same
    /// transaction.
    pub async fn record_leave(
        &self,
        room: &RoomRef,
        side: ClassRole,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut class = classes::lock_class_by_room(&mut tx, &room.room_key)
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

        let session_completed = session.record_leave(side, at, now);
        classes::update_session_state(&mut tx, &session).await?;

        let mut class_completed = false;
        if session_completed {
            let completed = classes::count_completed_sessions(&mut tx, class.id).await?;
            class_completed = class.apply_completed_count(completed as i32, now);
            classes::update_class_aggregate(&mut tx, &class).await?;
        }

        tx.commit().await?;

        if session_completed {
            info!(
                class_id = %class.id,
                session_number = session.session_number,
                tutor_minutes = session.participation.tutor.cumulative_minutes,
                student_minutes = session.participation.student.cumulative_minutes,
                "Session completed by participation"
            );
            metrics::record_session_completed();
            self.notify_completion(&class, session.session_number, now, class_completed);
        }

        Ok(())
    }

    fn notify_completion(
        &self,
        class: &LearningClass,
        session_number: i32,
        completed_at: DateTime<Utc>,
        class_completed: bool,
    ) {
        let payload = serde_json::json!({
            "class_id": class.id,
            "session_number": session_number,
            "completed_at": completed_at,
        });
        for user_id in [class.tutor_id, class.student_id] {
            notify_best_effort(&self.notifier, user_id, "session-completed", payload.clone());
        }

        if class_completed {
            info!(class_id = %class.id, "All sessions completed; class closed");
            let payload = serde_json::json!({ "class_id": class.id });
            for user_id in [class.tutor_id, class.student_id] {
                notify_best_effort(&self.notifier, user_id, "class-completed", payload.clone());
            }
        }
    }

}
