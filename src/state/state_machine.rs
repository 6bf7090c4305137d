use std::time::SystemTime;

use thiserror::Error;

use crate::{
    dao::models::{AnswerOption, RoomStateEntity, RoomStatePatch},
    state::room::RoomPhase,
};

/// Manual navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Presenter-issued events that move the room between phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Open voting on the current question.
    Open { duration_seconds: u32 },
    /// Close voting on `question_id`, revealing `answer` and moving to the next question.
    Close {
        question_id: u32,
        answer: AnswerOption,
    },
    /// Step to the neighbouring question without grading.
    Advance(Direction),
    /// Return the room to its initial record.
    Reset,
}

/// Why an operation is not allowed in the room's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateConflict {
    /// Answers are only accepted while voting is open.
    #[error("voting is closed")]
    VotingClosed,
    /// Voting is still open but the window has run out.
    #[error("the voting window has expired")]
    WindowExpired,
    /// Voting is already open on the current question.
    #[error("voting is already open on question {question_id}")]
    AlreadyActive { question_id: u32 },
    /// There is no open question to close.
    #[error("voting is not open")]
    NotActive,
    /// The question to close is not the one being voted on.
    #[error("question {got} is not the open question (open question is {expected})")]
    QuestionMismatch { expected: u32, got: u32 },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}: {reason}")]
pub struct InvalidTransition {
    /// The phase the room was in when the event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
    pub reason: StateConflict,
}

/// A validated transition, ready to be persisted as a single patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub from: RoomPhase,
    pub to: RoomPhase,
    pub event: RoomEvent,
    /// Fields the transition rewrites; nothing else is touched.
    pub patch: RoomStatePatch,
    /// Record as it will read once the patch is written.
    pub next: RoomStateEntity,
}

/// Pure transition rules of the room.
///
/// The machine keeps no state of its own: the room record lives in storage,
/// and every plan is computed against a freshly read copy of it.
#[derive(Debug, Clone, Copy)]
pub struct RoomStateMachine {
    default_duration_seconds: u32,
}

impl RoomStateMachine {
    pub fn new(default_duration_seconds: u32) -> Self {
        Self {
            default_duration_seconds,
        }
    }

    /// Record a fresh or reset room starts from.
    pub fn initial_state(&self) -> RoomStateEntity {
        RoomStateEntity::initial(self.default_duration_seconds)
    }

    /// Validate `event` against `current` and compute the patch it produces.
    pub fn plan(
        &self,
        current: &RoomStateEntity,
        event: RoomEvent,
        now: SystemTime,
    ) -> Result<Plan, InvalidTransition> {
        let from = RoomPhase::of(current);
        let patch = self
            .compute_patch(current, &event, now)
            .map_err(|reason| InvalidTransition {
                from: from.clone(),
                event: event.clone(),
                reason,
            })?;

        let mut next = current.clone();
        next.apply(&patch);

        Ok(Plan {
            from,
            to: RoomPhase::of(&next),
            event,
            patch,
            next,
        })
    }

    fn compute_patch(
        &self,
        current: &RoomStateEntity,
        event: &RoomEvent,
        now: SystemTime,
    ) -> Result<RoomStatePatch, StateConflict> {
        let patch = match *event {
            RoomEvent::Open { duration_seconds } => {
                if current.is_active {
                    return Err(StateConflict::AlreadyActive {
                        question_id: current.current_question_id,
                    });
                }
                RoomStatePatch {
                    is_active: Some(true),
                    start_time: Some(Some(now)),
                    duration_seconds: Some(duration_seconds),
                    correct_answer: Some(None),
                    ..Default::default()
                }
            }
            RoomEvent::Close {
                question_id,
                answer,
            } => {
                if !current.is_active {
                    return Err(StateConflict::NotActive);
                }
                if question_id != current.current_question_id {
                    return Err(StateConflict::QuestionMismatch {
                        expected: current.current_question_id,
                        got: question_id,
                    });
                }
                RoomStatePatch {
                    is_active: Some(false),
                    correct_answer: Some(Some(answer)),
                    current_question_id: Some(question_id.saturating_add(1)),
                    ..Default::default()
                }
            }
            RoomEvent::Advance(direction) => {
                let target = match direction {
                    Direction::Forward => current.current_question_id.saturating_add(1),
                    Direction::Backward => current.current_question_id.saturating_sub(1).max(1),
                };
                RoomStatePatch {
                    current_question_id: Some(target),
                    is_active: Some(false),
                    correct_answer: Some(None),
                    start_time: Some(None),
                    ..Default::default()
                }
            }
            RoomEvent::Reset => RoomStatePatch::replace_with(&self.initial_state()),
        };

        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(10_000)
    }

    fn apply(sm: &RoomStateMachine, state: &mut RoomStateEntity, event: RoomEvent) -> RoomPhase {
        let plan = sm.plan(state, event, now()).unwrap();
        state.apply(&plan.patch);
        assert_eq!(*state, plan.next);
        plan.to
    }

    #[test]
    fn open_close_cycle_advances_question() {
        let sm = RoomStateMachine::new(60);
        let mut state = sm.initial_state();

        assert_eq!(
            apply(&sm, &mut state, RoomEvent::Open { duration_seconds: 30 }),
            RoomPhase::Open {
                question_id: 1,
                started_at: Some(now()),
                duration_seconds: 30
            }
        );
        assert_eq!(
            apply(
                &sm,
                &mut state,
                RoomEvent::Close {
                    question_id: 1,
                    answer: AnswerOption::A
                }
            ),
            RoomPhase::Closed {
                question_id: 1,
                answer: AnswerOption::A
            }
        );
        assert_eq!(state.current_question_id, 2);
        assert!(!state.is_active);
        assert_eq!(state.correct_answer, Some(AnswerOption::A));

        // Reopening clears the revealed answer.
        apply(&sm, &mut state, RoomEvent::Open { duration_seconds: 30 });
        assert_eq!(state.correct_answer, None);
        assert_eq!(state.current_question_id, 2);
    }

    #[test]
    fn open_while_active_is_rejected() {
        let sm = RoomStateMachine::new(60);
        let mut state = sm.initial_state();
        apply(&sm, &mut state, RoomEvent::Open { duration_seconds: 60 });

        let err = sm
            .plan(&state, RoomEvent::Open { duration_seconds: 60 }, now())
            .unwrap_err();
        assert_eq!(err.reason, StateConflict::AlreadyActive { question_id: 1 });
    }

    #[test]
    fn close_requires_the_open_question() {
        let sm = RoomStateMachine::new(60);
        let mut state = sm.initial_state();

        let close = |question_id| RoomEvent::Close {
            question_id,
            answer: AnswerOption::B,
        };

        assert_eq!(
            sm.plan(&state, close(1), now()).unwrap_err().reason,
            StateConflict::NotActive
        );

        apply(&sm, &mut state, RoomEvent::Open { duration_seconds: 60 });
        assert_eq!(
            sm.plan(&state, close(2), now()).unwrap_err().reason,
            StateConflict::QuestionMismatch {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn advance_saturates_at_first_question_and_stops_voting() {
        let sm = RoomStateMachine::new(60);
        let mut state = sm.initial_state();

        apply(&sm, &mut state, RoomEvent::Advance(Direction::Backward));
        assert_eq!(state.current_question_id, 1);

        apply(&sm, &mut state, RoomEvent::Open { duration_seconds: 60 });
        let phase = apply(&sm, &mut state, RoomEvent::Advance(Direction::Forward));
        assert_eq!(phase, RoomPhase::Idle { question_id: 2 });
        assert!(!state.is_active);
        assert_eq!(state.start_time, None);
        assert_eq!(state.correct_answer, None);
    }

    #[test]
    fn reset_returns_to_initial_record() {
        let sm = RoomStateMachine::new(45);
        let mut state = sm.initial_state();
        apply(&sm, &mut state, RoomEvent::Advance(Direction::Forward));
        apply(&sm, &mut state, RoomEvent::Open { duration_seconds: 90 });

        apply(&sm, &mut state, RoomEvent::Reset);
        assert_eq!(state, RoomStateEntity::initial(45));
    }
}
