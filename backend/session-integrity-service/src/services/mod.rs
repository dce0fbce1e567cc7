pub mod identity;
pub mod notifier;
pub mod participation;
pub mod presence;
pub mod recording;
pub mod reports;

pub use identity::{HttpIdentityClient, IdentityClient};
pub use notifier::{HttpNotifier, Notifier};
pub use participation::ParticipationService;
pub use presence::{PresenceService, RoomRef};
pub use recording::RecordingService;
pub use reports::{CreateReportInput, EvidenceUpload, ReportService};
