//! Presence event normalizer
//!
//! Turns raw provider webhook deliveries into typed events and routes them
//! to the participation ledger and recording tracker. Presence telemetry is
//! non-authoritative, so everything except a signature failure is handled
//! internally and acknowledged to the provider; rejecting deliveries would
//! only buy us retry storms.

use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ClassRole, MeetingEvent, ParticipantInfo};
use crate::services::participation::ParticipationService;
use crate::services::recording::RecordingService;

type HmacSha256 = Hmac<Sha256>;

/// Display-name fragments that mark the tutor side when the provider does
/// not declare a moderator role. A heuristic; the durable fix is a stable
/// participant id echoed back by the provider integration.
const TUTOR_NAME_HINTS: &[&str] = &["tutor", "teacher", "instructor"];

/// `{prefix}-{24 hex chars}-{digits}` — the room shape our scheduling
/// integration provisions.
static ROOM_PRIMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.+-([0-9a-fA-F]{24})-(\d+)$").expect("failed to compile room pattern")
});

static ROOM_HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-fA-F]{24}").expect("failed to compile hex pattern"));

static TRAILING_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("failed to compile digits pattern"));

/// A provider room name resolved to its class room key and session number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRef {
    pub room_key: String,
    pub session_number: i32,
}

/// Resolve a provider room name to (room key, session number).
///
/// Any tenant prefix before the last `/` is stripped first. The strict
/// `{prefix}-{hex24}-{digits}` shape is tried before falling back to "some
/// 24-hex token plus trailing digits anywhere else in the string".
pub fn resolve_room(raw: &str) -> Option<RoomRef> {
    let room = raw.rsplit('/').next().unwrap_or(raw);

    if let Some(caps) = ROOM_PRIMARY_RE.captures(room) {
        let session_number: i32 = caps[2].parse().ok()?;
        return Some(RoomRef {
            room_key: caps[1].to_lowercase(),
            session_number,
        });
    }

    let hex = ROOM_HEX_RE.find(room)?;
    let digits = TRAILING_DIGITS_RE.find(room)?;
    // The trailing digit run must lie outside the hex token itself.
    if digits.start() < hex.end() {
        return None;
    }

    let session_number: i32 = digits.as_str().parse().ok()?;
    Some(RoomRef {
        room_key: hex.as_str().to_lowercase(),
        session_number,
    })
}

/// Which side of the class a participant belongs to: the provider-declared
/// moderator role wins, otherwise a display-name substring match.
pub fn infer_side(participant: &ParticipantInfo) -> ClassRole {
    if participant
        .role
        .as_deref()
        .is_some_and(|r| r.eq_ignore_ascii_case("moderator"))
    {
        return ClassRole::Tutor;
    }

    let name = participant.name.to_lowercase();
    if TUTOR_NAME_HINTS.iter().any(|hint| name.contains(hint)) {
        ClassRole::Tutor
    } else {
        ClassRole::Student
    }
}

/// Verify the provider's HMAC-SHA256 signature (hex-encoded) over the raw
/// payload. Comparison is constant-time via the hmac crate.
pub fn verify_signature(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);

    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    mac.verify_slice(&signature).is_ok()
}

/// Normalizes raw webhook deliveries and dispatches them.
pub struct PresenceService {
    participation: Arc<ParticipationService>,
    recording: Arc<RecordingService>,
    webhook_secret: Option<String>,
}

impl PresenceService {
    pub fn new(
        participation: Arc<ParticipationService>,
        recording: Arc<RecordingService>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            participation,
            recording,
            webhook_secret,
        }
    }

    /// Process one raw webhook delivery.
    ///
    /// Returns Err only for a signature rejection; malformed payloads,
    /// unresolvable rooms, and internal failures are logged and swallowed so
    /// the endpoint can acknowledge the delivery.
    pub async fn handle_delivery(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        if let Some(secret) = &self.webhook_secret {
            let provided = signature.ok_or(AppError::SignatureRejected)?;
            if !verify_signature(secret, body, provided) {
                metrics::record_webhook_event("unverified", "signature_rejected");
                return Err(AppError::SignatureRejected);
            }
        }

        let event: MeetingEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed presence payload");
                metrics::record_webhook_event("malformed", "dropped");
                return Ok(());
            }
        };

        let kind = event.kind();
        match self.apply_event(event).await {
            Ok(true) => metrics::record_webhook_event(kind, "applied"),
            Ok(false) => metrics::record_webhook_event(kind, "dropped"),
            Err(e) => {
                warn!(kind, error = %e, "Presence event failed internally; acknowledging anyway");
                metrics::record_webhook_event(kind, "error");
            }
        }

        Ok(())
    }

    async fn apply_event(&self, event: MeetingEvent) -> Result<bool> {
        match event {
            MeetingEvent::ParticipantJoined {
                room,
                timestamp,
                participant,
            } => {
                let Some(room_ref) = resolve_room(&room) else {
                    warn!(%room, "Dropping presence event with unresolvable room name");
                    return Ok(false);
                };
                let side = infer_side(&participant);
                debug!(room_key = %room_ref.room_key, session = room_ref.session_number,
                       side = side.as_str(), participant = %participant.name, "Participant joined");
                self.participation
                    .record_join(&room_ref, side, timestamp)
                    .await?;
                Ok(true)
            }
            MeetingEvent::ParticipantLeft {
                room,
                timestamp,
                participant,
            } => {
                let Some(room_ref) = resolve_room(&room) else {
                    warn!(%room, "Dropping presence event with unresolvable room name");
                    return Ok(false);
                };
                let side = infer_side(&participant);
                debug!(room_key = %room_ref.room_key, session = room_ref.session_number,
                       side = side.as_str(), participant = %participant.name, "Participant left");
                self.participation
                    .record_leave(&room_ref, side, timestamp)
                    .await?;
                Ok(true)
            }
            MeetingEvent::RecordingStatusChanged {
                room,
                timestamp,
                recording,
            } => {
                let Some(room_ref) = resolve_room(&room) else {
                    warn!(%room, "Dropping recording event with unresolvable room name");
                    return Ok(false);
                };
                self.recording
                    .apply_update(&room_ref, &recording, timestamp)
                    .await?;
                Ok(true)
            }
            MeetingEvent::Unknown => {
                warn!("Dropping presence event with unknown tag");
                Ok(false)
            }
        }
    }
}
