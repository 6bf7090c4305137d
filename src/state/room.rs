use std::time::{Duration, SystemTime};

use crate::dao::models::{AnswerOption, RoomStateEntity};

/// Phase of the room as derived from the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomPhase {
    /// Question `question_id` has not been opened yet.
    Idle { question_id: u32 },
    /// Voting is open for `question_id`.
    Open {
        question_id: u32,
        started_at: Option<SystemTime>,
        duration_seconds: u32,
    },
    /// `question_id` was closed with `answer`; the room already points at the next question.
    Closed { question_id: u32, answer: AnswerOption },
}

impl RoomPhase {
    /// Derive the phase from a room record.
    pub fn of(state: &RoomStateEntity) -> Self {
        if state.is_active {
            return RoomPhase::Open {
                question_id: state.current_question_id,
                started_at: state.start_time,
                duration_seconds: state.duration_seconds,
            };
        }

        match state.correct_answer {
            Some(answer) if state.current_question_id > 1 => RoomPhase::Closed {
                question_id: state.current_question_id - 1,
                answer,
            },
            _ => RoomPhase::Idle {
                question_id: state.current_question_id,
            },
        }
    }
}

/// Room record paired with the instant it was observed at.
///
/// Expiry is never stored: every reader derives it from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub state: RoomStateEntity,
    pub observed_at: SystemTime,
}

impl RoomSnapshot {
    pub fn new(state: RoomStateEntity, observed_at: SystemTime) -> Self {
        Self { state, observed_at }
    }

    pub fn phase(&self) -> RoomPhase {
        RoomPhase::of(&self.state)
    }

    /// Time since voting opened; zero if the clock reads earlier than the start.
    pub fn elapsed(&self) -> Option<Duration> {
        self.state.start_time.map(|start| {
            self.observed_at
                .duration_since(start)
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Whole seconds left in the voting window: `max(0, duration - elapsed)`.
    ///
    /// Elapsed time is truncated to whole seconds, so the window expires
    /// exactly `duration_seconds` after it opened. A missing start time counts
    /// as expired.
    pub fn remaining_seconds(&self) -> u32 {
        match self.elapsed() {
            Some(elapsed) => {
                let elapsed = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
                self.state.duration_seconds.saturating_sub(elapsed)
            }
            None => 0,
        }
    }

    /// Voting is formally open but the window has run out.
    pub fn is_expired(&self) -> bool {
        self.state.is_active && self.remaining_seconds() == 0
    }

    /// Question whose answer was revealed by the last close, if any.
    pub fn last_closed_question(&self) -> Option<u32> {
        match self.phase() {
            RoomPhase::Closed { question_id, .. } => Some(question_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn open_state(start: SystemTime, duration: u32) -> RoomStateEntity {
        RoomStateEntity {
            current_question_id: 1,
            is_active: true,
            correct_answer: None,
            start_time: Some(start),
            duration_seconds: duration,
        }
    }

    #[test]
    fn remaining_counts_down_and_saturates() {
        let start = UNIX_EPOCH + Duration::from_secs(1_000);
        let state = open_state(start, 60);

        let at = |secs: f64| RoomSnapshot::new(state.clone(), start + Duration::from_secs_f64(secs));

        assert_eq!(at(0.0).remaining_seconds(), 60);
        assert_eq!(at(59.5).remaining_seconds(), 1);
        assert!(!at(59.5).is_expired());
        assert_eq!(at(60.0).remaining_seconds(), 0);
        assert_eq!(at(61.0).remaining_seconds(), 0);
        assert!(at(61.0).is_expired());
    }

    #[test]
    fn clock_skew_counts_as_no_time_elapsed() {
        let start = UNIX_EPOCH + Duration::from_secs(1_000);
        let snapshot = RoomSnapshot::new(open_state(start, 30), start - Duration::from_secs(5));
        assert_eq!(snapshot.remaining_seconds(), 30);
    }

    #[test]
    fn open_without_start_time_is_expired() {
        let mut state = open_state(UNIX_EPOCH, 30);
        state.start_time = None;
        let snapshot = RoomSnapshot::new(state, UNIX_EPOCH);
        assert!(snapshot.is_expired());
    }

    #[test]
    fn phase_reflects_last_close() {
        let mut state = RoomStateEntity::initial(60);
        assert_eq!(RoomPhase::of(&state), RoomPhase::Idle { question_id: 1 });

        state.current_question_id = 2;
        state.correct_answer = Some(AnswerOption::C);
        assert_eq!(
            RoomPhase::of(&state),
            RoomPhase::Closed {
                question_id: 1,
                answer: AnswerOption::C
            }
        );
    }
}
