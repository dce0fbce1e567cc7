use actix_web::{web, App, HttpResponse, HttpServer};
use blob_store::BlobStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use session_integrity_service::{
    config::Config,
    handlers, metrics,
    services::{
        HttpIdentityClient, HttpNotifier, IdentityClient, Notifier, ParticipationService,
        PresenceService, RecordingService, ReportService,
    },
};

async fn health(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "session-integrity-service",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "session-integrity-service",
        })),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    tracing::info!("Starting Session Integrity Service...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        http_port = %config.http_port,
        "Configuration loaded"
    );

    // Initialize database pool
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Database pool initialized");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Migration failed: {}", e);
        e
    })?;
    tracing::info!("Migrations completed successfully");

    // Collaborator clients
    let blob_store = Arc::new(BlobStore::new().await?);
    let notifier: Arc<dyn Notifier> =
        Arc::new(HttpNotifier::new(config.notification_base_url.clone()));
    let identity: Arc<dyn IdentityClient> =
        Arc::new(HttpIdentityClient::new(config.identity_base_url.clone()));

    // Services
    let shared_pool = Arc::new(pool.clone());
    let participation = Arc::new(ParticipationService::new(
        shared_pool.clone(),
        notifier.clone(),
    ));
    let recording = Arc::new(RecordingService::new(shared_pool.clone()));
    let presence = web::Data::new(PresenceService::new(
        participation,
        recording,
        config.meeting_webhook_secret.clone(),
    ));
    let report_service = web::Data::new(ReportService::new(
        shared_pool,
        blob_store,
        notifier,
        identity,
        config.report_window_hours,
        config.max_evidence_files,
    ));
    let pool_data = web::Data::new(pool);

    let addr = format!("0.0.0.0:{}", config.http_port);
    tracing::info!("Session Integrity Service listening on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(presence.clone())
            .app_data(report_service.clone())
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&addr)?
    .run()
    .await?;

    Ok(())
}
