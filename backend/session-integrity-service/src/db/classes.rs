//! Database operations for learning classes and their sessions
//!
//! Presence reconciliation is read-modify-write on a shared aggregate, so
//! the mutating paths lock the class row first and the session row second,
//! always in that order, inside one transaction.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    LearningClass, Participation, Recording, RecordingStatus, Session, SessionStatus,
    SideAttendance,
};

const CLASS_COLUMNS: &str = r#"
    id, tutor_id, student_id, meeting_room_id, total_sessions,
    completed_sessions, status, actual_end_date, created_at, updated_at
"#;

const SESSION_COLUMNS: &str = r#"
    class_id, session_number, scheduled_date, duration_minutes, status,
    actual_start_time, actual_end_time,
    tutor_joined_at, tutor_left_at, tutor_minutes, tutor_join_count, tutor_in_session,
    student_joined_at, student_left_at, student_minutes, student_join_count, student_in_session,
    both_participated, participation_completed_at,
    recording_status, recording_id, recording_url, recording_duration,
    recording_file_size, recording_started_at, recording_ended_at
"#;

/// Flat projection of a `class_sessions` row.
#[derive(Debug, FromRow)]
struct SessionRow {
    class_id: Uuid,
    session_number: i32,
    scheduled_date: DateTime<Utc>,
    duration_minutes: i32,
    status: SessionStatus,
    actual_start_time: Option<DateTime<Utc>>,
    actual_end_time: Option<DateTime<Utc>>,

    tutor_joined_at: Option<DateTime<Utc>>,
    tutor_left_at: Option<DateTime<Utc>>,
    tutor_minutes: f64,
    tutor_join_count: i32,
    tutor_in_session: bool,
    student_joined_at: Option<DateTime<Utc>>,
    student_left_at: Option<DateTime<Utc>>,
    student_minutes: f64,
    student_join_count: i32,
    student_in_session: bool,
    both_participated: bool,
    participation_completed_at: Option<DateTime<Utc>>,

    recording_status: Option<RecordingStatus>,
    recording_id: Option<String>,
    recording_url: Option<String>,
    recording_duration: Option<i32>,
    recording_file_size: Option<i64>,
    recording_started_at: Option<DateTime<Utc>>,
    recording_ended_at: Option<DateTime<Utc>>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        let recording = row.recording_status.map(|status| Recording {
            status,
            recording_id: row.recording_id,
            recording_url: row.recording_url,
            duration: row.recording_duration,
            file_size: row.recording_file_size,
            started_at: row.recording_started_at,
            ended_at: row.recording_ended_at,
        });

        Session {
            class_id: row.class_id,
            session_number: row.session_number,
            scheduled_date: row.scheduled_date,
            duration_minutes: row.duration_minutes,
            status: row.status,
            actual_start_time: row.actual_start_time,
            actual_end_time: row.actual_end_time,
            participation: Participation {
                tutor: SideAttendance {
                    joined_at: row.tutor_joined_at,
                    left_at: row.tutor_left_at,
                    cumulative_minutes: row.tutor_minutes,
                    join_count: row.tutor_join_count,
                    in_session: row.tutor_in_session,
                },
                student: SideAttendance {
                    joined_at: row.student_joined_at,
                    left_at: row.student_left_at,
                    cumulative_minutes: row.student_minutes,
                    join_count: row.student_join_count,
                    in_session: row.student_in_session,
                },
                both_participated: row.both_participated,
                completed_at: row.participation_completed_at,
            },
            recording,
        }
    }
}

/// Get a class by id
pub async fn get_class(pool: &PgPool, class_id: Uuid) -> Result<Option<LearningClass>> {
    let class = sqlx::query_as::<_, LearningClass>(&format!(
        "SELECT {CLASS_COLUMNS} FROM learning_classes WHERE id = $1"
    ))
    .bind(class_id)
    .fetch_optional(pool)
    .await?;

    Ok(class)
}

/// Lock a class row for the duration of the transaction (per-class lock).
pub async fn lock_class(conn: &mut PgConnection, class_id: Uuid) -> Result<Option<LearningClass>> {
    let class = sqlx::query_as::<_, LearningClass>(&format!(
        "SELECT {CLASS_COLUMNS} FROM learning_classes WHERE id = $1 FOR UPDATE"
    ))
    .bind(class_id)
    .fetch_optional(conn)
    .await?;

    Ok(class)
}

/// Lock the class owning a meeting room key.
pub async fn lock_class_by_room(
    conn: &mut PgConnection,
    room_key: &str,
) -> Result<Option<LearningClass>> {
    let class = sqlx::query_as::<_, LearningClass>(&format!(
        "SELECT {CLASS_COLUMNS} FROM learning_classes WHERE meeting_room_id = $1 FOR UPDATE"
    ))
    .bind(room_key)
    .fetch_optional(conn)
    .await?;

    Ok(class)
}

/// Get a session by (class, number)
pub async fn get_session(
    pool: &PgPool,
    class_id: Uuid,
    session_number: i32,
) -> Result<Option<Session>> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM class_sessions WHERE class_id = $1 AND session_number = $2"
    ))
    .bind(class_id)
    .bind(session_number)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Session::from))
}

/// Lock a session row inside the current transaction. Callers must hold the
/// class lock already.
pub async fn lock_session(
    conn: &mut PgConnection,
    class_id: Uuid,
    session_number: i32,
) -> Result<Option<Session>> {
    let row = sqlx::query_as::<_, SessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM class_sessions \
         WHERE class_id = $1 AND session_number = $2 FOR UPDATE"
    ))
    .bind(class_id)
    .bind(session_number)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Session::from))
}

/// Persist a session's mutable state (participation, recording, lifecycle).
pub async fn update_session_state(conn: &mut PgConnection, session: &Session) -> Result<()> {
    let p = &session.participation;
    let rec = session.recording.as_ref();

    sqlx::query(
        r#"
        UPDATE class_sessions
        SET status = $3,
            actual_start_time = $4,
            actual_end_time = $5,
            tutor_joined_at = $6,
            tutor_left_at = $7,
            tutor_minutes = $8,
            tutor_join_count = $9,
            tutor_in_session = $10,
            student_joined_at = $11,
            student_left_at = $12,
            student_minutes = $13,
            student_join_count = $14,
            student_in_session = $15,
            both_participated = $16,
            participation_completed_at = $17,
            recording_status = $18,
            recording_id = $19,
            recording_url = $20,
            recording_duration = $21,
            recording_file_size = $22,
            recording_started_at = $23,
            recording_ended_at = $24,
            updated_at = NOW()
        WHERE class_id = $1 AND session_number = $2
        "#,
    )
    .bind(session.class_id)
    .bind(session.session_number)
    .bind(session.status)
    .bind(session.actual_start_time)
    .bind(session.actual_end_time)
    .bind(p.tutor.joined_at)
    .bind(p.tutor.left_at)
    .bind(p.tutor.cumulative_minutes)
    .bind(p.tutor.join_count)
    .bind(p.tutor.in_session)
    .bind(p.student.joined_at)
    .bind(p.student.left_at)
    .bind(p.student.cumulative_minutes)
    .bind(p.student.join_count)
    .bind(p.student.in_session)
    .bind(p.both_participated)
    .bind(p.completed_at)
    .bind(rec.map(|r| r.status))
    .bind(rec.and_then(|r| r.recording_id.clone()))
    .bind(rec.and_then(|r| r.recording_url.clone()))
    .bind(rec.and_then(|r| r.duration))
    .bind(rec.and_then(|r| r.file_size))
    .bind(rec.and_then(|r| r.started_at))
    .bind(rec.and_then(|r| r.ended_at))
    .execute(conn)
    .await?;

    Ok(())
}

/// Recount a class's completed sessions inside the current transaction.
pub async fn count_completed_sessions(conn: &mut PgConnection, class_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM class_sessions WHERE class_id = $1 AND status = 'completed'",
    )
    .bind(class_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}

/// Persist the aggregate fields the completion aggregator maintains.
pub async fn update_class_aggregate(conn: &mut PgConnection, class: &LearningClass) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE learning_classes
        SET completed_sessions = $2,
            status = $3,
            actual_end_date = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(class.id)
    .bind(class.completed_sessions)
    .bind(class.status)
    .bind(class.actual_end_date)
    .execute(conn)
    .await?;

    Ok(())
}
