pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{
    ClassRole, ClassStatus, Evidence, EvidenceType, LearningClass, MeetingEvent, Participation,
    Recording, RecordingStatus, ReportPriority, ReportStatus, Resolution, ResolutionDecision,
    Session, SessionReport, SessionStatus,
};
pub use services::{
    ParticipationService, PresenceService, RecordingService, ReportService, RoomRef,
};
