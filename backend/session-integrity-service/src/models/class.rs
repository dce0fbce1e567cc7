use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The two sides of a learning class. Doubles as the attendance side in the
/// participation ledger and as the reporter/reported role in disputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClassRole {
    Tutor,
    Student,
}

impl ClassRole {
    /// The opposite side of the class.
    pub fn complement(&self) -> ClassRole {
        match self {
            ClassRole::Tutor => ClassRole::Student,
            ClassRole::Student => ClassRole::Tutor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassRole::Tutor => "tutor",
            ClassRole::Student => "student",
        }
    }
}

/// Overall class lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Scheduled => "scheduled",
            ClassStatus::InProgress => "in_progress",
            ClassStatus::Completed => "completed",
            ClassStatus::Cancelled => "cancelled",
        }
    }
}

/// A tutoring class between one tutor and one student, tracked to completion
/// across `total_sessions` scheduled sessions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LearningClass {
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub student_id: Uuid,
    /// External meeting-room key the provider echoes back in room names.
    pub meeting_room_id: String,
    pub total_sessions: i32,
    pub completed_sessions: i32,
    pub status: ClassStatus,
    pub actual_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningClass {
    /// Which side of the class a user is on, if any.
    pub fn member_role(&self, user_id: Uuid) -> Option<ClassRole> {
        if user_id == self.tutor_id {
            Some(ClassRole::Tutor)
        } else if user_id == self.student_id {
            Some(ClassRole::Student)
        } else {
            None
        }
    }

    /// The other class member's user id.
    pub fn counterparty(&self, user_id: Uuid) -> Option<Uuid> {
        match self.member_role(user_id)? {
            ClassRole::Tutor => Some(self.student_id),
            ClassRole::Student => Some(self.tutor_id),
        }
    }

    pub fn member_for_role(&self, role: ClassRole) -> Uuid {
        match role {
            ClassRole::Tutor => self.tutor_id,
            ClassRole::Student => self.student_id,
        }
    }

    /// Completion aggregator: absorb the recomputed completed-session count
    /// and move the class to COMPLETED when every session is done. Returns
    /// true when the class transitioned to COMPLETED on this call.
    pub fn apply_completed_count(&mut self, completed: i32, now: DateTime<Utc>) -> bool {
        self.completed_sessions = completed;
        self.updated_at = now;

        if completed == self.total_sessions && self.status != ClassStatus::Completed {
            self.status = ClassStatus::Completed;
            self.actual_end_date = Some(now);
            return true;
        }
        false
    }
}
