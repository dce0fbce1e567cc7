//! Dispute workflow: intake gate, evidence custody, adjudication
//!
//! Intake runs its eligibility checks in a fixed order (first failure wins)
//! and relies on the storage-level unique index to close the race between
//! near-simultaneous duplicate submissions. Evidence is uploaded to the blob
//! store before anything is persisted; an upload failure aborts the whole
//! creation and any already-uploaded blobs are accepted garbage — they are
//! never referenced.

use blob_store::BlobStore;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::{classes, reports};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    AdminNote, Evidence, EvidenceType, LearningClass, ReportPriority, ReportStatus,
    ResolutionDecision, SessionReport,
};
use crate::services::identity::IdentityClient;
use crate::services::notifier::{notify_best_effort, Notifier};

const EVIDENCE_FOLDER: &str = "report-evidence";

/// One evidence file as received from the intake surface.
pub struct EvidenceUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct CreateReportInput {
    pub class_id: Uuid,
    pub session_number: i32,
    pub description: String,
    pub priority: Option<ReportPriority>,
    pub evidence: Vec<EvidenceUpload>,
}

/// Reporting-window policy: a report may be filed from the session's
/// scheduled start until `window_hours` after its scheduled end. Both edges
/// are exact: filing at the scheduled start succeeds, filing at the cutoff
/// instant fails.
pub fn check_reporting_window(
    scheduled_date: DateTime<Utc>,
    duration_minutes: i32,
    window_hours: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    if now < scheduled_date {
        return Err(AppError::WindowViolation(
            "Session has not started yet".to_string(),
        ));
    }

    let closes_at =
        scheduled_date + Duration::minutes(duration_minutes as i64) + Duration::hours(window_hours);
    if now >= closes_at {
        return Err(AppError::WindowViolation(
            "Reporting window has closed".to_string(),
        ));
    }

    Ok(())
}

pub struct ReportService {
    pool: Arc<PgPool>,
    blob_store: Arc<BlobStore>,
    notifier: Arc<dyn Notifier>,
    identity: Arc<dyn IdentityClient>,
    window_hours: i64,
    max_evidence_files: usize,
}

impl ReportService {
    pub fn new(
        pool: Arc<PgPool>,
        blob_store: Arc<BlobStore>,
        notifier: Arc<dyn Notifier>,
        identity: Arc<dyn IdentityClient>,
        window_hours: i64,
        max_evidence_files: usize,
    ) -> Self {
        Self {
            pool,
            blob_store,
            notifier,
            identity,
            window_hours,
            max_evidence_files,
        }
    }

    pub fn max_evidence_files(&self) -> usize {
        self.max_evidence_files
    }

    /// Intake gate: admit or reject a new report, then persist it with its
    /// evidence and notify the counter-party.
    pub async fn create_report(
        &self,
        reporter_id: Uuid,
        input: CreateReportInput,
    ) -> Result<SessionReport> {
        let class = classes::get_class(&self.pool, input.class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", input.class_id)))?;
        let session = classes::get_session(&self.pool, input.class_id, input.session_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Session {} not found for class {}",
                    input.session_number, input.class_id
                ))
            })?;

        check_reporting_window(
            session.scheduled_date,
            session.duration_minutes,
            self.window_hours,
            Utc::now(),
        )?;

        let reporter_role = class.member_role(reporter_id).ok_or_else(|| {
            AppError::Forbidden("Only the class tutor or student may file a report".to_string())
        })?;

        if input.description.trim().is_empty() {
            return Err(AppError::Validation("Description must not be empty".to_string()));
        }
        if input.evidence.len() > self.max_evidence_files {
            return Err(AppError::Validation(format!(
                "At most {} evidence files are allowed",
                self.max_evidence_files
            )));
        }

        // Friendlier duplicate check; the unique index remains authoritative
        // under concurrency.
        if reports::exists_for_reporter(
            &self.pool,
            input.class_id,
            input.session_number,
            reporter_id,
        )
        .await?
        {
            return Err(AppError::Conflict(
                "A report for this session by this reporter already exists".to_string(),
            ));
        }

        let reporter_name = self.identity.display_name(reporter_id).await?;

        // Uploads happen before the insert; a failure here aborts creation.
        let evidence_rows = self.upload_evidence(&class, input.evidence).await?;

        let priority = input.priority.unwrap_or_default();
        let new_report = reports::NewReport {
            class_id: input.class_id,
            session_number: input.session_number,
            reporter_id,
            reporter_role,
            reporter_name: &reporter_name,
            reported_against: reporter_role.complement(),
            description: input.description.trim(),
            priority,
        };

        let mut tx = self.pool.begin().await?;
        let mut report = reports::insert_report(&mut tx, &new_report).await?;
        report.evidence = reports::insert_evidence(&mut tx, report.id, &evidence_rows).await?;
        tx.commit().await?;

        info!(
            report_id = %report.id,
            class_id = %report.class_id,
            session_number = report.session_number,
            reporter_role = reporter_role.as_str(),
            priority = priority.as_str(),
            "Session report created"
        );
        metrics::record_report_created(priority.as_str());

        let counterparty = class.member_for_role(reporter_role.complement());
        notify_best_effort(
            &self.notifier,
            counterparty,
            "session-report-filed",
            serde_json::json!({
                "report_id": report.id,
                "class_id": report.class_id,
                "session_number": report.session_number,
            }),
        );

        Ok(report)
    }

    /// Append evidence to an existing report. Only the original reporter may
    /// do so, and only while the report is still open.
    pub async fn add_evidence(
        &self,
        caller_id: Uuid,
        report_id: Uuid,
        files: Vec<EvidenceUpload>,
    ) -> Result<Vec<Evidence>> {
        let report = reports::get_report(&self.pool, report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        if report.reporter_id != caller_id {
            return Err(AppError::Forbidden(
                "Only the reporter may attach evidence".to_string(),
            ));
        }
        if report.status.is_terminal() {
            return Err(AppError::Forbidden(
                "Evidence cannot be added to a closed report".to_string(),
            ));
        }
        if files.is_empty() {
            return Err(AppError::Validation("No evidence files provided".to_string()));
        }
        if files.len() > self.max_evidence_files {
            return Err(AppError::Validation(format!(
                "At most {} evidence files are allowed per request",
                self.max_evidence_files
            )));
        }

        let class = classes::get_class(&self.pool, report.class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", report.class_id)))?;
        let rows = self.upload_evidence(&class, files).await?;

        let mut tx = self.pool.begin().await?;
        let inserted = reports::insert_evidence(&mut tx, report_id, &rows).await?;
        tx.commit().await?;

        info!(report_id = %report_id, count = inserted.len(), "Evidence appended to report");

        Ok(inserted)
    }

    async fn upload_evidence(
        &self,
        class: &LearningClass,
        files: Vec<EvidenceUpload>,
    ) -> Result<Vec<reports::NewEvidence>> {
        let folder = format!("{}/{}", EVIDENCE_FOLDER, class.id);
        let mut rows = Vec::with_capacity(files.len());

        for file in files {
            let evidence_type = EvidenceType::from_content_type(&file.content_type);
            let url = self
                .blob_store
                .upload(&folder, &file.file_name, &file.content_type, file.bytes)
                .await?;
            rows.push(reports::NewEvidence {
                url,
                evidence_type,
                file_name: Some(file.file_name),
            });
        }

        Ok(rows)
    }

    /// Administrative status transition. Moving to UNDER_REVIEW notifies the
    /// reporter; re-setting the current status is a no-op.
    pub async fn set_status(
        &self,
        admin_id: Uuid,
        report_id: Uuid,
        next: ReportStatus,
    ) -> Result<SessionReport> {
        let mut report = reports::get_report(&self.pool, report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        let changed = report.transition_status(next, Utc::now())?;
        if !changed {
            return Ok(report);
        }

        reports::update_status(&self.pool, &report).await?;

        info!(
            report_id = %report_id,
            admin_id = %admin_id,
            status = next.as_str(),
            "Report status updated"
        );

        if next == ReportStatus::UnderReview {
            notify_best_effort(
                &self.notifier,
                report.reporter_id,
                "report-under-review",
                serde_json::json!({ "report_id": report.id }),
            );
        }

        Ok(report)
    }

    /// Adjudicate a report. The violator set is derived from the decision
    /// and both class members are notified of the outcome.
    pub async fn resolve(
        &self,
        admin_id: Uuid,
        report_id: Uuid,
        decision: ResolutionDecision,
        message: String,
    ) -> Result<SessionReport> {
        let mut report = reports::get_report(&self.pool, report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;
        let class = classes::get_class(&self.pool, report.class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", report.class_id)))?;

        report.resolve(
            admin_id,
            decision,
            message,
            class.student_id,
            class.tutor_id,
            Utc::now(),
        )?;
        reports::apply_resolution(&self.pool, &report).await?;

        info!(
            report_id = %report_id,
            admin_id = %admin_id,
            decision = decision.as_str(),
            violators = report.violator_user_ids.len(),
            "Report resolved"
        );

        let payload = serde_json::json!({
            "report_id": report.id,
            "decision": decision,
            "violator_user_ids": report.violator_user_ids,
        });
        for user_id in [class.tutor_id, class.student_id] {
            notify_best_effort(&self.notifier, user_id, "report-resolved", payload.clone());
        }

        Ok(report)
    }

    /// Append an admin audit note. Permitted regardless of report status.
    pub async fn add_note(
        &self,
        admin_id: Uuid,
        report_id: Uuid,
        note: String,
    ) -> Result<AdminNote> {
        if note.trim().is_empty() {
            return Err(AppError::Validation("Note must not be empty".to_string()));
        }

        reports::get_report(&self.pool, report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        let note = reports::insert_note(&self.pool, report_id, admin_id, note.trim()).await?;
        Ok(note)
    }

    /// Full report with evidence custody list and audit notes.
    pub async fn get_report(&self, report_id: Uuid) -> Result<SessionReport> {
        reports::get_report_with_details(&self.pool, report_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))
    }

    /// Reports filed for a class, newest first.
    pub async fn list_for_class(&self, class_id: Uuid) -> Result<Vec<SessionReport>> {
        classes::get_class(&self.pool, class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", class_id)))?;

        reports::list_reports_for_class(&self.pool, class_id).await
    }

    /// Admin queue with total count for pagination.
    pub async fn admin_queue(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SessionReport>, i64)> {
        let reports = reports::list_admin_reports(&self.pool, status, limit, offset).await?;
        let total = reports::count_admin_reports(&self.pool, status).await?;
        Ok((reports, total))
    }
}
