//! Session read surface for scheduling/admin callers

use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::classes;
use crate::error::{AppError, Result};

/// GET /api/v1/classes/{class_id}/sessions/{session_number}
///
/// Participation ledger and recording state for one session.
pub async fn get_session(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid, i32)>,
) -> Result<HttpResponse> {
    let (class_id, session_number) = path.into_inner();

    let session = classes::get_session(&pool, class_id, session_number)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Session {} not found for class {}",
                session_number, class_id
            ))
        })?;

    Ok(HttpResponse::Ok().json(session))
}
