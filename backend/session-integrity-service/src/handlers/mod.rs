pub mod reports;
pub mod sessions;
pub mod webhooks;

use actix_web::web;

/// Wire up all service routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/webhooks/meeting-events",
        web::post().to(webhooks::meeting_events),
    )
    .service(
        web::scope("/api/v1")
            .route(
                "/classes/{class_id}/sessions/{session_number}",
                web::get().to(sessions::get_session),
            )
            .route(
                "/classes/{class_id}/sessions/{session_number}/reports",
                web::post().to(reports::create_report),
            )
            .route(
                "/classes/{class_id}/reports",
                web::get().to(reports::list_class_reports),
            )
            .route("/reports/{report_id}", web::get().to(reports::get_report))
            .route(
                "/reports/{report_id}/evidence",
                web::post().to(reports::add_evidence),
            )
            .route(
                "/reports/{report_id}/status",
                web::patch().to(reports::update_status),
            )
            .route(
                "/reports/{report_id}/resolve",
                web::post().to(reports::resolve_report),
            )
            .route(
                "/reports/{report_id}/notes",
                web::post().to(reports::add_note),
            )
            .route("/admin/reports", web::get().to(reports::admin_queue)),
    );
}
