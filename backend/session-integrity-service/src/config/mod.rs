use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server configuration
    pub http_port: u16,

    // Database configuration
    pub database_url: String,
    pub db_max_connections: u32,

    // Meeting provider webhook
    pub meeting_webhook_secret: Option<String>,

    // Dispute policy
    pub report_window_hours: i64,
    pub max_evidence_files: usize,

    // Collaborator endpoints
    pub notification_base_url: String,
    pub identity_base_url: String,

    // Service configuration
    pub service_name: String,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8094".to_string())
                .parse()
                .unwrap_or(8094),
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            meeting_webhook_secret: env::var("MEETING_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            report_window_hours: env::var("REPORT_WINDOW_HOURS")
                .unwrap_or_else(|_| "48".to_string())
                .parse()
                .unwrap_or(48),
            max_evidence_files: env::var("MAX_EVIDENCE_FILES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            notification_base_url: env::var("NOTIFICATION_SERVICE_URL")
                .unwrap_or_else(|_| "http://notification-service:8085".to_string()),
            identity_base_url: env::var("IDENTITY_SERVICE_URL")
                .unwrap_or_else(|_| "http://identity-service:8081".to_string()),
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "session-integrity-service".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }
}
