//! Room projections shared by the public, student and admin APIs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::AnswerOption,
    dto::format_system_time,
    state::{RoomPhase, RoomSnapshot},
};

/// Phase of the room as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// The current question has not been opened yet.
    Idle,
    /// Voting is open on the current question.
    Open,
    /// The previous question was closed and its answer revealed.
    Closed,
}

impl From<&RoomPhase> for VisibleRoomPhase {
    fn from(phase: &RoomPhase) -> Self {
        match phase {
            RoomPhase::Idle { .. } => VisibleRoomPhase::Idle,
            RoomPhase::Open { .. } => VisibleRoomPhase::Open,
            RoomPhase::Closed { .. } => VisibleRoomPhase::Closed,
        }
    }
}

/// Room record with the derived timer fields, polled by every client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomView {
    pub current_question_id: u32,
    pub is_active: bool,
    /// Answer revealed by the last close; cleared when voting reopens.
    pub correct_answer: Option<AnswerOption>,
    /// RFC 3339 instant voting opened at.
    pub start_time: Option<String>,
    pub duration_seconds: u32,
    pub phase: VisibleRoomPhase,
    /// Question whose answer `correct_answer` reveals, when closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_question_id: Option<u32>,
    /// Whole seconds left to vote; zero when voting is not open.
    pub remaining_seconds: u32,
    /// Voting is open but the window has run out.
    pub expired: bool,
    /// Server clock at the time of the read, for client-side countdowns.
    pub server_time: String,
}

impl From<&RoomSnapshot> for RoomView {
    fn from(snapshot: &RoomSnapshot) -> Self {
        let state = &snapshot.state;
        let phase = snapshot.phase();
        Self {
            current_question_id: state.current_question_id,
            is_active: state.is_active,
            correct_answer: state.correct_answer,
            start_time: state.start_time.map(format_system_time),
            duration_seconds: state.duration_seconds,
            phase: (&phase).into(),
            closed_question_id: snapshot.last_closed_question(),
            remaining_seconds: if state.is_active {
                snapshot.remaining_seconds()
            } else {
                0
            },
            expired: snapshot.is_expired(),
            server_time: format_system_time(snapshot.observed_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::RoomStateEntity;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn idle_room_reports_no_time_left() {
        let snapshot = RoomSnapshot::new(RoomStateEntity::initial(60), UNIX_EPOCH);
        let view = RoomView::from(&snapshot);
        assert_eq!(view.phase, VisibleRoomPhase::Idle);
        assert_eq!(view.remaining_seconds, 0);
        assert!(!view.expired);
        assert_eq!(view.start_time, None);
        assert_eq!(view.server_time, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn open_room_counts_down() {
        let start = UNIX_EPOCH + Duration::from_secs(100);
        let mut state = RoomStateEntity::initial(60);
        state.is_active = true;
        state.start_time = Some(start);

        let view = RoomView::from(&RoomSnapshot::new(state, start + Duration::from_secs(15)));
        assert_eq!(view.phase, VisibleRoomPhase::Open);
        assert_eq!(view.remaining_seconds, 45);
        assert_eq!(view.start_time.as_deref(), Some("1970-01-01T00:01:40Z"));
    }
}
