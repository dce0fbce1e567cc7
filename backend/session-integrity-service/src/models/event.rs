//! Typed presence events from the meeting provider
//!
//! The provider's webhook payload is a tagged union on the `event` field.
//! Tags we do not know about land in the `Unknown` arm and are dropped by
//! the normalizer instead of failing deserialization.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum MeetingEvent {
    ParticipantJoined {
        room: String,
        timestamp: DateTime<Utc>,
        participant: ParticipantInfo,
    },
    ParticipantLeft {
        room: String,
        timestamp: DateTime<Utc>,
        participant: ParticipantInfo,
    },
    RecordingStatusChanged {
        room: String,
        timestamp: DateTime<Utc>,
        recording: RecordingInfo,
    },
    #[serde(other)]
    Unknown,
}

impl MeetingEvent {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MeetingEvent::ParticipantJoined { .. } => "participant-joined",
            MeetingEvent::ParticipantLeft { .. } => "participant-left",
            MeetingEvent::RecordingStatusChanged { .. } => "recording-status-changed",
            MeetingEvent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-declared role; "moderator" marks the meeting host.
    #[serde(default)]
    pub role: Option<String>,
}

/// Recording payload statuses as the provider sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingEventStatus {
    Started,
    Stopped,
    Available,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub status: RecordingEventStatus,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_participant_joined() {
        let payload = r#"{
            "event": "participant-joined",
            "room": "tenant/lesson-65a1b2c3d4e5f6a7b8c9d0e1-3",
            "timestamp": "2024-01-10T10:02:00Z",
            "participant": {"id": "p-1", "name": "Tutor Jane", "role": "moderator"}
        }"#;

        let event: MeetingEvent = serde_json::from_str(payload).unwrap();
        match event {
            MeetingEvent::ParticipantJoined { room, timestamp, participant } => {
                assert_eq!(room, "tenant/lesson-65a1b2c3d4e5f6a7b8c9d0e1-3");
                assert_eq!(timestamp.to_rfc3339(), "2024-01-10T10:02:00+00:00");
                assert_eq!(participant.name, "Tutor Jane");
                assert_eq!(participant.role.as_deref(), Some("moderator"));
                assert!(participant.email.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_recording_status_changed() {
        let payload = r#"{
            "event": "recording-status-changed",
            "room": "lesson-65a1b2c3d4e5f6a7b8c9d0e1-3",
            "timestamp": "2024-01-10T11:00:00Z",
            "recording": {"id": "rec-9", "status": "available",
                          "download_url": "https://cdn.example/rec-9.mp4",
                          "duration": 3480, "size": 1048576}
        }"#;

        let event: MeetingEvent = serde_json::from_str(payload).unwrap();
        match event {
            MeetingEvent::RecordingStatusChanged { recording, .. } => {
                assert_eq!(recording.status, RecordingEventStatus::Available);
                assert_eq!(recording.duration, Some(3480));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_tag_lands_in_unknown_arm() {
        let payload = r#"{"event": "participant-muted", "room": "x", "timestamp": "2024-01-10T10:00:00Z"}"#;
        let event: MeetingEvent = serde_json::from_str(payload).unwrap();
        assert!(matches!(event, MeetingEvent::Unknown));
        assert_eq!(event.kind(), "unknown");
    }

    #[test]
    fn test_unknown_recording_status_parses() {
        let raw = r#"{"id": "rec-1", "status": "paused"}"#;
        let info: RecordingInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.status, RecordingEventStatus::Unknown);
    }
}
