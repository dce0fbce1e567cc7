//! Report handlers - HTTP endpoints for the dispute workflow

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{ReportPriority, ReportStatus, ResolutionDecision, SessionReport};
use crate::services::{CreateReportInput, EvidenceUpload, ReportService};

/// Hard cap per evidence file; the blob store is not a video platform.
const MAX_EVIDENCE_BYTES: usize = 25 * 1024 * 1024;

struct ReportForm {
    description: String,
    priority: Option<ReportPriority>,
    evidence: Vec<EvidenceUpload>,
}

/// Drain a multipart payload into description/priority fields and evidence
/// files. Unknown fields are ignored.
async fn collect_report_form(payload: &mut Multipart, max_files: usize) -> Result<ReportForm> {
    let mut description = String::new();
    let mut priority = None;
    let mut evidence = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?;

        let (field_name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => continue,
        };
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?;
            bytes.extend_from_slice(&chunk);
            if bytes.len() > MAX_EVIDENCE_BYTES {
                return Err(AppError::Validation(format!(
                    "Evidence file exceeds {} byte limit",
                    MAX_EVIDENCE_BYTES
                )));
            }
        }

        match field_name.as_str() {
            "description" => {
                description = String::from_utf8_lossy(&bytes).trim().to_string();
            }
            "priority" => {
                let raw = String::from_utf8_lossy(&bytes).trim().to_string();
                if !raw.is_empty() {
                    priority = Some(ReportPriority::parse(&raw).ok_or_else(|| {
                        AppError::Validation(format!("Unknown priority: {raw}"))
                    })?);
                }
            }
            "evidence" => {
                if evidence.len() >= max_files {
                    return Err(AppError::Validation(format!(
                        "At most {} evidence files are allowed",
                        max_files
                    )));
                }
                evidence.push(EvidenceUpload {
                    file_name: file_name.unwrap_or_else(|| "evidence".to_string()),
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(ReportForm {
        description,
        priority,
        evidence,
    })
}

/// File a new report for a session.
/// POST /api/v1/classes/{class_id}/sessions/{session_number}/reports
pub async fn create_report(
    path: web::Path<(Uuid, i32)>,
    user: AuthenticatedUser,
    service: web::Data<ReportService>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let (class_id, session_number) = path.into_inner();
    let form = collect_report_form(&mut payload, service.max_evidence_files()).await?;

    let report = service
        .create_report(
            user.0,
            CreateReportInput {
                class_id,
                session_number,
                description: form.description,
                priority: form.priority,
                evidence: form.evidence,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(report))
}

/// Append evidence to an existing report.
/// POST /api/v1/reports/{report_id}/evidence
pub async fn add_evidence(
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
    service: web::Data<ReportService>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let report_id = path.into_inner();
    let form = collect_report_form(&mut payload, service.max_evidence_files()).await?;

    let evidence = service.add_evidence(user.0, report_id, form.evidence).await?;

    Ok(HttpResponse::Created().json(evidence))
}

/// Get a report with its evidence and audit notes.
/// GET /api/v1/reports/{report_id}
pub async fn get_report(
    path: web::Path<Uuid>,
    service: web::Data<ReportService>,
) -> Result<HttpResponse> {
    let report = service.get_report(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// List reports filed for a class.
/// GET /api/v1/classes/{class_id}/reports
pub async fn list_class_reports(
    path: web::Path<Uuid>,
    service: web::Data<ReportService>,
) -> Result<HttpResponse> {
    let reports = service.list_for_class(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reports))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReportStatus,
}

/// Administrative status transition.
/// PATCH /api/v1/reports/{report_id}/status
pub async fn update_status(
    path: web::Path<Uuid>,
    admin: AdminUser,
    service: web::Data<ReportService>,
    req: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse> {
    let report = service
        .set_status(admin.0, path.into_inner(), req.status)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub decision: ResolutionDecision,
    pub message: String,
}

/// Adjudicate a report.
/// POST /api/v1/reports/{report_id}/resolve
pub async fn resolve_report(
    path: web::Path<Uuid>,
    admin: AdminUser,
    service: web::Data<ReportService>,
    req: web::Json<ResolveRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    let report = service
        .resolve(admin.0, path.into_inner(), req.decision, req.message)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

/// Append an admin audit note.
/// POST /api/v1/reports/{report_id}/notes
pub async fn add_note(
    path: web::Path<Uuid>,
    admin: AdminUser,
    service: web::Data<ReportService>,
    req: web::Json<AddNoteRequest>,
) -> Result<HttpResponse> {
    let note = service
        .add_note(admin.0, path.into_inner(), req.into_inner().note)
        .await?;
    Ok(HttpResponse::Created().json(note))
}

#[derive(Debug, Deserialize)]
pub struct AdminQueueQuery {
    pub status: Option<ReportStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AdminQueueResponse {
    pub reports: Vec<SessionReport>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Admin review queue, oldest first.
/// GET /api/v1/admin/reports
pub async fn admin_queue(
    _admin: AdminUser,
    service: web::Data<ReportService>,
    query: web::Query<AdminQueueQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let (reports, total) = service.admin_queue(query.status, limit, offset).await?;

    Ok(HttpResponse::Ok().json(AdminQueueResponse {
        reports,
        total,
        limit,
        offset,
    }))
}
