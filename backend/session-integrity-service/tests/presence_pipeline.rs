/// End-to-end tests for the presence pipeline: raw provider payloads are
/// verified, parsed into typed events, resolved to a session, and applied to
/// the participation ledger. Everything below the storage layer is exercised.
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use session_integrity_service::models::{
    ClassRole, MeetingEvent, Participation, Session, SessionStatus,
};
use session_integrity_service::services::presence::{
    infer_side, resolve_room, verify_signature,
};

const ROOM_KEY: &str = "65a1b2c3d4e5f6a7b8c9d0e1";

fn ts(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap()
}

fn presence_payload(event: &str, name: &str, role: Option<&str>, timestamp: DateTime<Utc>) -> String {
    let role_field = role
        .map(|r| format!(r#", "role": "{r}""#))
        .unwrap_or_default();
    format!(
        r#"{{
            "event": "{event}",
            "room": "acme/lesson-{ROOM_KEY}-3",
            "timestamp": "{}",
            "participant": {{"id": "p-1", "name": "{name}"{role_field}}}
        }}"#,
        timestamp.to_rfc3339()
    )
}

fn scheduled_session() -> Session {
    Session {
        class_id: Uuid::new_v4(),
        session_number: 3,
        scheduled_date: ts(10, 0),
        duration_minutes: 60,
        status: SessionStatus::Scheduled,
        actual_start_time: None,
        actual_end_time: None,
        participation: Participation::default(),
        recording: None,
    }
}

/// Apply a parsed presence event to a session the way the ledger does.
fn apply(session: &mut Session, payload: &str) -> bool {
    let event: MeetingEvent = serde_json::from_str(payload).unwrap();
    match event {
        MeetingEvent::ParticipantJoined {
            room,
            timestamp,
            participant,
        } => {
            let resolved = resolve_room(&room).unwrap();
            assert_eq!(resolved.room_key, ROOM_KEY);
            assert_eq!(resolved.session_number, 3);
            session.record_join(infer_side(&participant), timestamp);
            false
        }
        MeetingEvent::ParticipantLeft {
            room,
            timestamp,
            participant,
        } => {
            let resolved = resolve_room(&room).unwrap();
            assert_eq!(resolved.session_number, 3);
            session.record_leave(infer_side(&participant), timestamp, timestamp)
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_worked_example_completes_session_at_1050() {
    // Tutor: 10:02 -> 10:40 (38min). Student: 10:05 -> 10:10 (5min), then
    // 10:15 -> 10:50 (35min, 40min total). Both cross the 30min threshold,
    // so the final leave completes the session.
    let mut session = scheduled_session();

    assert!(!apply(
        &mut session,
        &presence_payload("participant-joined", "Tutor Jane", Some("moderator"), ts(10, 2)),
    ));
    assert!(!apply(
        &mut session,
        &presence_payload("participant-joined", "Sam", None, ts(10, 5)),
    ));
    assert!(!apply(
        &mut session,
        &presence_payload("participant-left", "Sam", None, ts(10, 10)),
    ));
    assert!(!apply(
        &mut session,
        &presence_payload("participant-joined", "Sam", None, ts(10, 15)),
    ));
    assert!(!apply(
        &mut session,
        &presence_payload("participant-left", "Tutor Jane", Some("moderator"), ts(10, 40)),
    ));
    assert!(apply(
        &mut session,
        &presence_payload("participant-left", "Sam", None, ts(10, 50)),
    ));

    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.participation.both_participated);
    assert_eq!(session.actual_start_time, Some(ts(10, 2)));
    assert_eq!(session.actual_end_time, Some(ts(10, 50)));
    assert_eq!(session.participation.tutor.cumulative_minutes, 38.0);
    assert_eq!(session.participation.student.cumulative_minutes, 40.0);
}

#[test]
fn test_duplicate_deliveries_do_not_inflate_the_ledger() {
    let mut session = scheduled_session();

    let join = presence_payload("participant-joined", "Tutor Jane", Some("moderator"), ts(10, 0));
    let leave = presence_payload("participant-left", "Tutor Jane", Some("moderator"), ts(10, 20));

    apply(&mut session, &join);
    apply(&mut session, &join); // at-least-once delivery
    apply(&mut session, &leave);
    apply(&mut session, &leave); // duplicate leave is an orphan

    assert_eq!(session.participation.tutor.cumulative_minutes, 20.0);
    assert_eq!(session.participation.tutor.join_count, 2);
    assert!(!session.participation.tutor.in_session);
}

#[test]
fn test_side_attribution_flows_from_payload() {
    let mut session = scheduled_session();

    // No moderator flag, but the display name marks the tutor side.
    apply(
        &mut session,
        &presence_payload("participant-joined", "teacher bob", None, ts(10, 0)),
    );
    assert_eq!(session.participation.tutor.join_count, 1);
    assert_eq!(session.participation.student.join_count, 0);

    apply(
        &mut session,
        &presence_payload("participant-joined", "Ada", None, ts(10, 1)),
    );
    assert_eq!(session.participation.student.join_count, 1);
}

#[test]
fn test_unknown_event_is_parseable_and_droppable() {
    let payload = r#"{"event": "chat-message", "room": "x", "timestamp": "2024-01-10T10:00:00Z"}"#;
    let event: MeetingEvent = serde_json::from_str(payload).unwrap();
    assert!(matches!(event, MeetingEvent::Unknown));
}

#[test]
fn test_signature_gate_matches_provider_hmac() {
    let secret = "provider-shared-secret";
    let body = presence_payload("participant-joined", "Sam", None, ts(10, 0));

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    assert!(verify_signature(secret, body.as_bytes(), &signature));

    // A tampered body must fail against the original signature.
    let tampered = body.replace("Sam", "Mallory");
    assert!(!verify_signature(secret, tampered.as_bytes(), &signature));
}

#[test]
fn test_moderator_flag_beats_student_looking_name() {
    let payload = presence_payload("participant-joined", "Sam", Some("moderator"), ts(10, 0));
    let event: MeetingEvent = serde_json::from_str(&payload).unwrap();
    let MeetingEvent::ParticipantJoined { participant, .. } = event else {
        panic!("expected join event");
    };
    assert_eq!(infer_side(&participant), ClassRole::Tutor);
}
