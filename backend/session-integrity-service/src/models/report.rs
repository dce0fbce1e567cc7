use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::class::ClassRole;
use crate::error::AppError;

/// Report workflow status.
///
/// Note the two DISMISSED axes in this subsystem: a report whose *status* is
/// DISMISSED was never adjudicated (an admin declined to act), while a report
/// resolved with *decision* DISMISSED was fully adjudicated and carries
/// status RESOLVED. The two are deliberately distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    UnderReview,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    /// Forward-only transitions; UNDER_REVIEW may be skipped entirely.
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::UnderReview)
                | (ReportStatus::Pending, ReportStatus::Resolved)
                | (ReportStatus::Pending, ReportStatus::Dismissed)
                | (ReportStatus::UnderReview, ReportStatus::Resolved)
                | (ReportStatus::UnderReview, ReportStatus::Dismissed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::UnderReview => "under_review",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for ReportPriority {
    fn default() -> Self {
        ReportPriority::Medium
    }
}

impl ReportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Low => "low",
            ReportPriority::Medium => "medium",
            ReportPriority::High => "high",
            ReportPriority::Critical => "critical",
        }
    }

    /// Case-insensitive parse used for multipart form fields.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ReportPriority::Low),
            "medium" => Some(ReportPriority::Medium),
            "high" => Some(ReportPriority::High),
            "critical" => Some(ReportPriority::Critical),
            _ => None,
        }
    }
}

/// Adjudication decision. DISMISSED here means "adjudicated: no one is at
/// fault and no action is taken" and still yields status RESOLVED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionDecision {
    StudentFault,
    TutorFault,
    BothFault,
    NoFault,
    Dismissed,
}

impl ResolutionDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionDecision::StudentFault => "student_fault",
            ResolutionDecision::TutorFault => "tutor_fault",
            ResolutionDecision::BothFault => "both_fault",
            ResolutionDecision::NoFault => "no_fault",
            ResolutionDecision::Dismissed => "dismissed",
        }
    }

    /// The violator set is fully determined by the decision.
    pub fn violators(&self, student_id: Uuid, tutor_id: Uuid) -> Vec<Uuid> {
        match self {
            ResolutionDecision::StudentFault => vec![student_id],
            ResolutionDecision::TutorFault => vec![tutor_id],
            ResolutionDecision::BothFault => vec![student_id, tutor_id],
            ResolutionDecision::NoFault | ResolutionDecision::Dismissed => vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceType {
    Image,
    Video,
    Document,
}

impl EvidenceType {
    /// Classify by declared content-type prefix; anything that is neither an
    /// image nor a video counts as a document.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("image/") {
            EvidenceType::Image
        } else if ct.starts_with("video/") {
            EvidenceType::Video
        } else {
            EvidenceType::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Image => "image",
            EvidenceType::Video => "video",
            EvidenceType::Document => "document",
        }
    }
}

/// One evidence file in a report's append-only custody list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Evidence {
    pub id: Uuid,
    pub report_id: Uuid,
    pub url: String,
    pub evidence_type: EvidenceType,
    pub file_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Append-only admin audit note.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminNote {
    pub id: Uuid,
    pub report_id: Uuid,
    pub admin_id: Uuid,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: Uuid,
    pub decision: ResolutionDecision,
    pub message: String,
    pub resolved_at: DateTime<Utc>,
}

/// A dispute filed by one class member against the other for a specific
/// session. Created once inside the reporting window, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub class_id: Uuid,
    pub session_number: i32,
    pub reporter_id: Uuid,
    pub reporter_role: ClassRole,
    /// Display name snapshotted at filing time.
    pub reporter_name: String,
    pub reported_against: ClassRole,
    pub description: String,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub resolution: Option<Resolution>,
    pub violator_user_ids: Vec<Uuid>,
    pub evidence: Vec<Evidence>,
    pub admin_notes: Vec<AdminNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionReport {
    /// Administrative status transition. Re-setting the current status is a
    /// no-op (returns false); anything that is not a forward transition is
    /// rejected.
    pub fn transition_status(
        &mut self,
        next: ReportStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        if next == self.status {
            return Ok(false);
        }

        if !self.status.can_transition_to(next) {
            return Err(AppError::Forbidden(format!(
                "Report cannot move from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }

        self.status = next;
        self.updated_at = now;
        Ok(true)
    }

    /// Adjudicate the report. The status becomes RESOLVED unconditionally,
    /// even for decision DISMISSED; the violator set is derived from the
    /// decision and the class membership.
    pub fn resolve(
        &mut self,
        resolved_by: Uuid,
        decision: ResolutionDecision,
        message: String,
        student_id: Uuid,
        tutor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if self.status == ReportStatus::Resolved {
            return Err(AppError::Forbidden("Report is already resolved".to_string()));
        }
        if self.status == ReportStatus::Dismissed {
            return Err(AppError::Forbidden(
                "Report was dismissed without adjudication".to_string(),
            ));
        }

        self.violator_user_ids = decision.violators(student_id, tutor_id);
        self.resolution = Some(Resolution {
            resolved_by,
            decision,
            message,
            resolved_at: now,
        });
        self.status = ReportStatus::Resolved;
        self.updated_at = now;
        Ok(())
    }
}
