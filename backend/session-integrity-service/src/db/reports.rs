//! Database operations for session reports, evidence, and admin notes

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    AdminNote, ClassRole, Evidence, EvidenceType, ReportPriority, ReportStatus, Resolution,
    ResolutionDecision, SessionReport,
};

const REPORT_COLUMNS: &str = r#"
    id, class_id, session_number, reporter_id, reporter_role, reporter_name,
    reported_against, description, status, priority,
    resolved_by, resolution_decision, resolution_message, resolved_at,
    violator_user_ids, created_at, updated_at
"#;

/// Flat projection of a `session_reports` row.
#[derive(Debug, FromRow)]
struct ReportRow {
    id: Uuid,
    class_id: Uuid,
    session_number: i32,
    reporter_id: Uuid,
    reporter_role: ClassRole,
    reporter_name: String,
    reported_against: ClassRole,
    description: String,
    status: ReportStatus,
    priority: ReportPriority,
    resolved_by: Option<Uuid>,
    resolution_decision: Option<ResolutionDecision>,
    resolution_message: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    violator_user_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReportRow> for SessionReport {
    fn from(row: ReportRow) -> Self {
        let resolution = match (row.resolved_by, row.resolution_decision, row.resolved_at) {
            (Some(resolved_by), Some(decision), Some(resolved_at)) => Some(Resolution {
                resolved_by,
                decision,
                message: row.resolution_message.unwrap_or_default(),
                resolved_at,
            }),
            _ => None,
        };

        SessionReport {
            id: row.id,
            class_id: row.class_id,
            session_number: row.session_number,
            reporter_id: row.reporter_id,
            reporter_role: row.reporter_role,
            reporter_name: row.reporter_name,
            reported_against: row.reported_against,
            description: row.description,
            status: row.status,
            priority: row.priority,
            resolution,
            violator_user_ids: row.violator_user_ids,
            evidence: vec![],
            admin_notes: vec![],
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// New report input for insertion
pub struct NewReport<'a> {
    pub class_id: Uuid,
    pub session_number: i32,
    pub reporter_id: Uuid,
    pub reporter_role: ClassRole,
    pub reporter_name: &'a str,
    pub reported_against: ClassRole,
    pub description: &'a str,
    pub priority: ReportPriority,
}

/// Evidence row to append to a report
pub struct NewEvidence {
    pub url: String,
    pub evidence_type: EvidenceType,
    pub file_name: Option<String>,
}

/// Application-level duplicate check. The unique index remains the
/// authoritative guard; this only produces a friendlier error earlier.
pub async fn exists_for_reporter(
    pool: &PgPool,
    class_id: Uuid,
    session_number: i32,
    reporter_id: Uuid,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM session_reports
            WHERE class_id = $1 AND session_number = $2 AND reporter_id = $3
        )
        "#,
    )
    .bind(class_id)
    .bind(session_number)
    .bind(reporter_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Insert a new report. A unique-index violation (two near-simultaneous
/// submissions from the same reporter) surfaces as Conflict.
pub async fn insert_report(conn: &mut PgConnection, input: &NewReport<'_>) -> Result<SessionReport> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        INSERT INTO session_reports (
            class_id, session_number, reporter_id, reporter_role, reporter_name,
            reported_against, description, status, priority, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, NOW(), NOW())
        RETURNING {REPORT_COLUMNS}
        "#
    ))
    .bind(input.class_id)
    .bind(input.session_number)
    .bind(input.reporter_id)
    .bind(input.reporter_role)
    .bind(input.reporter_name)
    .bind(input.reported_against)
    .bind(input.description)
    .bind(input.priority)
    .fetch_one(conn)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
            "A report for this session by this reporter already exists".to_string(),
        ),
        _ => AppError::Database(e),
    })?;

    Ok(SessionReport::from(row))
}

/// Append evidence rows to a report (custody list is append-only).
pub async fn insert_evidence(
    conn: &mut PgConnection,
    report_id: Uuid,
    items: &[NewEvidence],
) -> Result<Vec<Evidence>> {
    let mut inserted = Vec::with_capacity(items.len());

    for item in items {
        let evidence = sqlx::query_as::<_, Evidence>(
            r#"
            INSERT INTO report_evidence (report_id, url, evidence_type, file_name, uploaded_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, report_id, url, evidence_type, file_name, uploaded_at
            "#,
        )
        .bind(report_id)
        .bind(&item.url)
        .bind(item.evidence_type)
        .bind(&item.file_name)
        .fetch_one(&mut *conn)
        .await?;

        inserted.push(evidence);
    }

    Ok(inserted)
}

/// Get a report without its evidence/notes sublists
pub async fn get_report(pool: &PgPool, report_id: Uuid) -> Result<Option<SessionReport>> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM session_reports WHERE id = $1"
    ))
    .bind(report_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(SessionReport::from))
}

/// Get a report with its evidence custody list and admin notes
pub async fn get_report_with_details(
    pool: &PgPool,
    report_id: Uuid,
) -> Result<Option<SessionReport>> {
    let Some(mut report) = get_report(pool, report_id).await? else {
        return Ok(None);
    };

    report.evidence = list_evidence(pool, report_id).await?;
    report.admin_notes = list_notes(pool, report_id).await?;

    Ok(Some(report))
}

/// Evidence custody list, in upload order
pub async fn list_evidence(pool: &PgPool, report_id: Uuid) -> Result<Vec<Evidence>> {
    let evidence = sqlx::query_as::<_, Evidence>(
        r#"
        SELECT id, report_id, url, evidence_type, file_name, uploaded_at
        FROM report_evidence
        WHERE report_id = $1
        ORDER BY uploaded_at ASC, id ASC
        "#,
    )
    .bind(report_id)
    .fetch_all(pool)
    .await?;

    Ok(evidence)
}

/// Admin notes, oldest first
pub async fn list_notes(pool: &PgPool, report_id: Uuid) -> Result<Vec<AdminNote>> {
    let notes = sqlx::query_as::<_, AdminNote>(
        r#"
        SELECT id, report_id, admin_id, note, created_at
        FROM report_admin_notes
        WHERE report_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(report_id)
    .fetch_all(pool)
    .await?;

    Ok(notes)
}

/// Reports filed for a class, newest first
pub async fn list_reports_for_class(pool: &PgPool, class_id: Uuid) -> Result<Vec<SessionReport>> {
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        SELECT {REPORT_COLUMNS} FROM session_reports
        WHERE class_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SessionReport::from).collect())
}

/// Admin queue, optionally filtered by status, oldest first
pub async fn list_admin_reports(
    pool: &PgPool,
    status: Option<ReportStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<SessionReport>> {
    let rows = if let Some(status) = status {
        sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM session_reports
            WHERE status = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {REPORT_COLUMNS} FROM session_reports
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    };

    Ok(rows.into_iter().map(SessionReport::from).collect())
}

/// Count reports for the admin queue
pub async fn count_admin_reports(pool: &PgPool, status: Option<ReportStatus>) -> Result<i64> {
    let count: i64 = if let Some(status) = status {
        sqlx::query_scalar("SELECT COUNT(*) FROM session_reports WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await?
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM session_reports")
            .fetch_one(pool)
            .await?
    };

    Ok(count)
}

/// Persist a status transition
pub async fn update_status(pool: &PgPool, report: &SessionReport) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE session_reports
        SET status = $2, updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(report.id)
    .bind(report.status)
    .bind(report.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist an adjudication outcome
pub async fn apply_resolution(pool: &PgPool, report: &SessionReport) -> Result<()> {
    let resolution = report
        .resolution
        .as_ref()
        .ok_or_else(|| AppError::Internal("Resolution missing on resolved report".to_string()))?;

    sqlx::query(
        r#"
        UPDATE session_reports
        SET status = $2,
            resolved_by = $3,
            resolution_decision = $4,
            resolution_message = $5,
            resolved_at = $6,
            violator_user_ids = $7,
            updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(report.id)
    .bind(report.status)
    .bind(resolution.resolved_by)
    .bind(resolution.decision)
    .bind(&resolution.message)
    .bind(resolution.resolved_at)
    .bind(&report.violator_user_ids)
    .bind(report.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append an admin audit note
pub async fn insert_note(
    pool: &PgPool,
    report_id: Uuid,
    admin_id: Uuid,
    note: &str,
) -> Result<AdminNote> {
    let note = sqlx::query_as::<_, AdminNote>(
        r#"
        INSERT INTO report_admin_notes (report_id, admin_id, note, created_at)
        VALUES ($1, $2, $3, NOW())
        RETURNING id, report_id, admin_id, note, created_at
        "#,
    )
    .bind(report_id)
    .bind(admin_id)
    .bind(note)
    .fetch_one(pool)
    .await?;

    Ok(note)
}
