use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

static WEBHOOK_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "session_integrity_webhook_events_total",
            "Presence webhook deliveries by event kind and outcome",
        ),
        &["event", "outcome"],
    )
    .expect("failed to create session_integrity_webhook_events_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register session_integrity_webhook_events_total");
    counter
});

static SESSIONS_COMPLETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "session_integrity_sessions_completed_total",
        "Sessions auto-completed by the participation ledger",
    )
    .expect("failed to create session_integrity_sessions_completed_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register session_integrity_sessions_completed_total");
    counter
});

static REPORTS_CREATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "session_integrity_reports_created_total",
            "Session reports admitted by the intake gate",
        ),
        &["priority"],
    )
    .expect("failed to create session_integrity_reports_created_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register session_integrity_reports_created_total");
    counter
});

pub fn record_webhook_event(event: &str, outcome: &str) {
    WEBHOOK_EVENTS_TOTAL.with_label_values(&[event, outcome]).inc();
}

pub fn record_session_completed() {
    SESSIONS_COMPLETED_TOTAL.inc();
}

pub fn record_report_created(priority: &str) {
    REPORTS_CREATED_TOTAL.with_label_values(&[priority]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
