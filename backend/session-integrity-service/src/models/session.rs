use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::class::ClassRole;
use super::event::{RecordingEventStatus, RecordingInfo};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// One side's attendance ledger for a session.
///
/// `in_session` marks a currently-open interval. It MUST be cleared on every
/// close so repeated join/leave cycles measure disjoint intervals; leaving it
/// set would re-measure from the original join time on every leave.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideAttendance {
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    /// Accumulated minutes across all closed intervals. Never decreases.
    pub cumulative_minutes: f64,
    pub join_count: i32,
    pub in_session: bool,
}

impl SideAttendance {
    /// Register a join event. Duplicate joins while an interval is open only
    /// bump the join counter.
    pub fn record_join(&mut self, at: DateTime<Utc>) {
        if !self.in_session {
            self.joined_at = Some(at);
            self.left_at = None;
            self.in_session = true;
        }
        self.join_count += 1;
    }

    /// Register a leave event, closing the open interval if one exists.
    /// Returns true when an interval was actually closed; orphan leaves
    /// (duplicate or out-of-order) are no-ops.
    pub fn record_leave(&mut self, at: DateTime<Utc>) -> bool {
        if !self.in_session {
            return false;
        }

        let Some(joined_at) = self.joined_at else {
            self.in_session = false;
            return false;
        };

        let delta_seconds = (at - joined_at).num_seconds().max(0);
        self.cumulative_minutes += delta_seconds as f64 / 60.0;
        self.left_at = Some(at);
        self.in_session = false;
        true
    }
}

/// Per-session attendance aggregate for both sides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participation {
    pub tutor: SideAttendance,
    pub student: SideAttendance,
    pub both_participated: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Participation {
    pub fn side(&self, role: ClassRole) -> &SideAttendance {
        match role {
            ClassRole::Tutor => &self.tutor,
            ClassRole::Student => &self.student,
        }
    }

    pub fn side_mut(&mut self, role: ClassRole) -> &mut SideAttendance {
        match role {
            ClassRole::Tutor => &mut self.tutor,
            ClassRole::Student => &mut self.student,
        }
    }
}

/// Recording lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    Recording,
    Processing,
    Ready,
    Failed,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Recording => "recording",
            RecordingStatus::Processing => "processing",
            RecordingStatus::Ready => "ready",
            RecordingStatus::Failed => "failed",
        }
    }
}

/// Session recording metadata. A session has at most one authoritative
/// recording; a later "started" overwrites the previous generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub status: RecordingStatus,
    pub recording_id: Option<String>,
    pub recording_url: Option<String>,
    pub duration: Option<i32>,
    pub file_size: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Recording {
    fn started(recording_id: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: RecordingStatus::Recording,
            recording_id,
            recording_url: None,
            duration: None,
            file_size: None,
            started_at: Some(at),
            ended_at: None,
        }
    }
}

/// One scheduled occurrence of a class.
///
/// Rows are created by the scheduling service; this service reconciles
/// presence telemetry into the participation ledger and completion state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub class_id: Uuid,
    pub session_number: i32,
    pub scheduled_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub participation: Participation,
    pub recording: Option<Recording>,
}

impl Session {
    /// Minutes each side must accumulate before the session counts as held.
    pub fn completion_threshold_minutes(&self) -> f64 {
        self.duration_minutes as f64 / 2.0
    }

    /// Apply a join event for one side. The session's actual start time is
    /// stamped once, on the first join by either side.
    pub fn record_join(&mut self, side: ClassRole, at: DateTime<Utc>) {
        self.participation.side_mut(side).record_join(at);

        if self.actual_start_time.is_none() {
            self.actual_start_time = Some(at);
        }
    }

    /// Apply a leave event for one side, then re-evaluate the completion
    /// rule. Returns true when this event completed the session.
    pub fn record_leave(&mut self, side: ClassRole, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.participation.side_mut(side).record_leave(at);
        self.try_complete(now)
    }

    /// Completion rule: while still SCHEDULED, once both sides have
    /// accumulated at least half the scheduled duration the session is
    /// complete. Idempotent; completion can be reached by accretion across
    /// multiple join/leave cycles.
    pub fn try_complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != SessionStatus::Scheduled {
            return false;
        }

        let threshold = self.completion_threshold_minutes();
        if self.participation.tutor.cumulative_minutes >= threshold
            && self.participation.student.cumulative_minutes >= threshold
        {
            self.participation.both_participated = true;
            self.participation.completed_at = Some(now);
            self.status = SessionStatus::Completed;
            self.actual_end_time = Some(now);
            return true;
        }
        false
    }

    /// Advance the recording state machine. Returns true when state changed;
    /// transitions not permitted by the current state are ignored, as are
    /// unknown provider statuses.
    pub fn apply_recording_event(&mut self, update: &RecordingInfo, at: DateTime<Utc>) -> bool {
        match update.status {
            RecordingEventStatus::Started => {
                // A fresh start overwrites any previous generation.
                self.recording = Some(Recording::started(update.id.clone(), at));
                true
            }
            RecordingEventStatus::Stopped => match &mut self.recording {
                Some(rec) if rec.status == RecordingStatus::Recording => {
                    rec.status = RecordingStatus::Processing;
                    rec.ended_at = Some(at);
                    true
                }
                _ => false,
            },
            RecordingEventStatus::Available => match &mut self.recording {
                Some(rec) if rec.status == RecordingStatus::Processing => {
                    rec.status = RecordingStatus::Ready;
                    if update.id.is_some() {
                        rec.recording_id = update.id.clone();
                    }
                    rec.recording_url = update.download_url.clone();
                    rec.duration = update.duration;
                    rec.file_size = update.size;
                    true
                }
                _ => false,
            },
            RecordingEventStatus::Failed => match &mut self.recording {
                Some(rec)
                    if matches!(
                        rec.status,
                        RecordingStatus::Recording | RecordingStatus::Processing
                    ) =>
                {
                    rec.status = RecordingStatus::Failed;
                    true
                }
                _ => false,
            },
            RecordingEventStatus::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap()
    }

    fn session(duration_minutes: i32) -> Session {
        Session {
            class_id: Uuid::new_v4(),
            session_number: 3,
            scheduled_date: at(10, 0),
            duration_minutes,
            status: SessionStatus::Scheduled,
            actual_start_time: None,
            actual_end_time: None,
            participation: Participation::default(),
            recording: None,
        }
    }

    fn recording_info(status: RecordingEventStatus) -> RecordingInfo {
        RecordingInfo {
            id: Some("rec-1".to_string()),
            status,
            download_url: Some("https://provider.example/rec-1.mp4".to_string()),
            duration: Some(3480),
            size: Some(104_857_600),
        }
    }

    #[test]
    fn test_single_interval_accumulates_exact_duration() {
        let mut s = session(60);
        s.record_join(ClassRole::Tutor, at(10, 2));
        s.record_leave(ClassRole::Tutor, at(10, 40), at(10, 40));
        assert_eq!(s.participation.tutor.cumulative_minutes, 38.0);
        assert_eq!(s.participation.tutor.join_count, 1);
        assert!(!s.participation.tutor.in_session);
    }

    #[test]
    fn test_no_double_counting_across_repeated_cycles() {
        // Two join/leave cycles must measure disjoint intervals: 5 + 35,
        // never 5 + 45 (re-measuring from the original join).
        let mut s = session(60);
        s.record_join(ClassRole::Student, at(10, 5));
        s.record_leave(ClassRole::Student, at(10, 10), at(10, 10));
        s.record_join(ClassRole::Student, at(10, 15));
        s.record_leave(ClassRole::Student, at(10, 50), at(10, 50));
        assert_eq!(s.participation.student.cumulative_minutes, 40.0);
        assert_eq!(s.participation.student.join_count, 2);
    }

    #[test]
    fn test_duplicate_join_keeps_open_interval() {
        let mut s = session(60);
        s.record_join(ClassRole::Tutor, at(10, 0));
        s.record_join(ClassRole::Tutor, at(10, 7));
        assert_eq!(s.participation.tutor.joined_at, Some(at(10, 0)));
        assert_eq!(s.participation.tutor.join_count, 2);

        s.record_leave(ClassRole::Tutor, at(10, 30), at(10, 30));
        assert_eq!(s.participation.tutor.cumulative_minutes, 30.0);
    }

    #[test]
    fn test_orphan_leave_is_ignored() {
        let mut s = session(60);
        assert!(!s.record_leave(ClassRole::Student, at(10, 30), at(10, 30)));
        assert_eq!(s.participation.student.cumulative_minutes, 0.0);
        assert!(s.participation.student.left_at.is_none());

        // A leave after the interval already closed is also a no-op.
        s.record_join(ClassRole::Student, at(10, 0));
        s.record_leave(ClassRole::Student, at(10, 20), at(10, 20));
        s.record_leave(ClassRole::Student, at(10, 25), at(10, 25));
        assert_eq!(s.participation.student.cumulative_minutes, 20.0);
        assert_eq!(s.participation.student.left_at, Some(at(10, 20)));
    }

    #[test]
    fn test_out_of_order_leave_clamps_to_zero() {
        let mut s = session(60);
        s.record_join(ClassRole::Tutor, at(10, 30));
        // Leave timestamped before the join: interval closes with zero delta.
        s.record_leave(ClassRole::Tutor, at(10, 20), at(10, 20));
        assert_eq!(s.participation.tutor.cumulative_minutes, 0.0);
        assert!(!s.participation.tutor.in_session);
    }

    #[test]
    fn test_actual_start_time_set_once_by_first_join() {
        let mut s = session(60);
        s.record_join(ClassRole::Student, at(10, 5));
        s.record_join(ClassRole::Tutor, at(10, 2));
        assert_eq!(s.actual_start_time, Some(at(10, 5)));
    }

    #[test]
    fn test_completion_requires_both_sides() {
        let mut s = session(60);
        s.record_join(ClassRole::Tutor, at(10, 0));
        assert!(!s.record_leave(ClassRole::Tutor, at(10, 45), at(10, 45)));
        assert_eq!(s.status, SessionStatus::Scheduled);
        assert!(!s.participation.both_participated);
    }

    #[test]
    fn test_completion_by_accretion_across_cycles() {
        // The worked example: tutor 38min in one interval; student 5min +
        // 35min across two cycles. Both cross the 30min threshold, so the
        // session completes on the student's final leave at 10:50.
        let mut s = session(60);

        s.record_join(ClassRole::Tutor, at(10, 2));
        s.record_join(ClassRole::Student, at(10, 5));
        assert!(!s.record_leave(ClassRole::Student, at(10, 10), at(10, 10)));
        s.record_join(ClassRole::Student, at(10, 15));
        assert!(!s.record_leave(ClassRole::Tutor, at(10, 40), at(10, 40)));
        assert!(s.record_leave(ClassRole::Student, at(10, 50), at(10, 50)));

        assert_eq!(s.status, SessionStatus::Completed);
        assert!(s.participation.both_participated);
        assert_eq!(s.participation.completed_at, Some(at(10, 50)));
        assert_eq!(s.actual_end_time, Some(at(10, 50)));
        assert_eq!(s.participation.tutor.cumulative_minutes, 38.0);
        assert_eq!(s.participation.student.cumulative_minutes, 40.0);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut s = session(60);
        s.record_join(ClassRole::Tutor, at(10, 0));
        s.record_leave(ClassRole::Tutor, at(10, 40), at(10, 40));
        s.record_join(ClassRole::Student, at(10, 0));
        assert!(s.record_leave(ClassRole::Student, at(10, 40), at(10, 40)));

        let completed_at = s.participation.completed_at;

        // Further presence traffic must not re-complete or move the stamps.
        s.record_join(ClassRole::Student, at(10, 45));
        assert!(!s.record_leave(ClassRole::Student, at(10, 55), at(10, 55)));
        assert_eq!(s.participation.completed_at, completed_at);
        assert_eq!(s.status, SessionStatus::Completed);
    }

    #[test]
    fn test_no_completion_for_cancelled_session() {
        let mut s = session(60);
        s.status = SessionStatus::Cancelled;
        s.record_join(ClassRole::Tutor, at(10, 0));
        s.record_join(ClassRole::Student, at(10, 0));
        s.record_leave(ClassRole::Tutor, at(11, 0), at(11, 0));
        assert!(!s.record_leave(ClassRole::Student, at(11, 0), at(11, 0)));
        assert_eq!(s.status, SessionStatus::Cancelled);
    }

    #[test]
    fn test_recording_happy_path() {
        let mut s = session(60);

        assert!(s.apply_recording_event(&recording_info(RecordingEventStatus::Started), at(10, 0)));
        let rec = s.recording.as_ref().unwrap();
        assert_eq!(rec.status, RecordingStatus::Recording);
        assert_eq!(rec.started_at, Some(at(10, 0)));
        assert!(rec.recording_url.is_none());

        assert!(s.apply_recording_event(&recording_info(RecordingEventStatus::Stopped), at(11, 0)));
        assert_eq!(s.recording.as_ref().unwrap().status, RecordingStatus::Processing);
        assert_eq!(s.recording.as_ref().unwrap().ended_at, Some(at(11, 0)));

        assert!(s.apply_recording_event(&recording_info(RecordingEventStatus::Available), at(11, 10)));
        let rec = s.recording.as_ref().unwrap();
        assert_eq!(rec.status, RecordingStatus::Ready);
        assert_eq!(rec.recording_id.as_deref(), Some("rec-1"));
        assert_eq!(rec.recording_url.as_deref(), Some("https://provider.example/rec-1.mp4"));
        assert_eq!(rec.duration, Some(3480));
        assert_eq!(rec.file_size, Some(104_857_600));
    }

    #[test]
    fn test_recording_failure_paths() {
        let mut s = session(60);
        s.apply_recording_event(&recording_info(RecordingEventStatus::Started), at(10, 0));
        assert!(s.apply_recording_event(&recording_info(RecordingEventStatus::Failed), at(10, 5)));
        assert_eq!(s.recording.as_ref().unwrap().status, RecordingStatus::Failed);

        // FAILED is terminal for this generation.
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Stopped), at(10, 6)));
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Available), at(10, 7)));
    }

    #[test]
    fn test_recording_out_of_order_events_ignored() {
        let mut s = session(60);

        // No generation yet: stop/available/failed have nothing to act on.
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Stopped), at(10, 0)));
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Available), at(10, 0)));
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Failed), at(10, 0)));
        assert!(s.recording.is_none());

        s.apply_recording_event(&recording_info(RecordingEventStatus::Started), at(10, 0));
        // Available straight from RECORDING is not a legal transition.
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Available), at(10, 5)));
        assert_eq!(s.recording.as_ref().unwrap().status, RecordingStatus::Recording);
    }

    #[test]
    fn test_recording_restart_begins_new_generation() {
        let mut s = session(60);
        s.apply_recording_event(&recording_info(RecordingEventStatus::Started), at(10, 0));
        s.apply_recording_event(&recording_info(RecordingEventStatus::Stopped), at(10, 30));
        s.apply_recording_event(&recording_info(RecordingEventStatus::Available), at(10, 35));
        assert_eq!(s.recording.as_ref().unwrap().status, RecordingStatus::Ready);

        let restart = RecordingInfo {
            id: Some("rec-2".to_string()),
            status: RecordingEventStatus::Started,
            download_url: None,
            duration: None,
            size: None,
        };
        assert!(s.apply_recording_event(&restart, at(10, 40)));
        let rec = s.recording.as_ref().unwrap();
        assert_eq!(rec.status, RecordingStatus::Recording);
        assert_eq!(rec.recording_id.as_deref(), Some("rec-2"));
        assert!(rec.recording_url.is_none());
        assert!(rec.ended_at.is_none());
    }

    #[test]
    fn test_unknown_recording_status_ignored() {
        let mut s = session(60);
        s.apply_recording_event(&recording_info(RecordingEventStatus::Started), at(10, 0));
        assert!(!s.apply_recording_event(&recording_info(RecordingEventStatus::Unknown), at(10, 5)));
        assert_eq!(s.recording.as_ref().unwrap().status, RecordingStatus::Recording);
    }
}
