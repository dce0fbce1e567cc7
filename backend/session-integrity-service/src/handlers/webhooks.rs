//! Meeting provider webhook endpoint
//!
//! The provider retries on non-2xx responses, so this endpoint acknowledges
//! every delivery it can parse or internally drop. The only rejection that
//! escapes is a signature failure.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::Result;
use crate::services::PresenceService;

const SIGNATURE_HEADER: &str = "x-meeting-signature";

/// POST /webhooks/meeting-events
pub async fn meeting_events(
    req: HttpRequest,
    body: web::Bytes,
    presence: web::Data<PresenceService>,
) -> Result<HttpResponse> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    presence.handle_delivery(&body, signature).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
