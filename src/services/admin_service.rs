//! Business logic powering the presenter REST routes. Every operation goes
//! through [`AppState::run_transition`](crate::state::AppState::run_transition),
//! so only one presenter transition is in flight at a time.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::{MAX_DURATION_SECONDS, MIN_DURATION_SECONDS},
    dao::{
        ledger::ResponseLedger,
        models::{AnswerOption, AwardOutcome},
        room_store::RoomStore,
    },
    dto::{admin::CloseQuestionResponse, room::RoomView},
    error::ServiceError,
    state::{Direction, PresenterToken, RoomEvent, SharedState, StateConflict},
};

/// Open voting on the current question for `duration_seconds` (or the configured default).
pub async fn open_question(
    state: &SharedState,
    _token: &PresenterToken,
    duration_seconds: Option<u32>,
) -> Result<RoomView, ServiceError> {
    if let Some(duration) = duration_seconds {
        if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration) {
            return Err(ServiceError::Validation(format!(
                "duration must be between {MIN_DURATION_SECONDS} and {MAX_DURATION_SECONDS} seconds (got {duration})"
            )));
        }
    }
    let duration_seconds = state.config().resolve_duration(duration_seconds);

    let ((), room) = state
        .run_transition(RoomEvent::Open { duration_seconds }, |_, _| async { Ok(()) })
        .await?;

    info!(
        question_id = room.state.current_question_id,
        duration_seconds, "voting opened"
    );
    Ok(RoomView::from(&room))
}

/// Close voting on `question_id`, credit every participant who picked
/// `answer`, and move the room to the next question.
///
/// Closing a question that was already closed changes nothing and reports
/// the recorded grading. After a rewind the question can be closed again:
/// it is regraded against the new answer, participants matching it who were
/// not credited yet earn their point, and nobody loses one.
pub async fn close_question(
    state: &SharedState,
    _token: &PresenterToken,
    question_id: u32,
    answer: AnswerOption,
) -> Result<CloseQuestionResponse, ServiceError> {
    let retry = state.config().retry;
    let event = RoomEvent::Close {
        question_id,
        answer,
    };

    let result = state
        .run_transition(event, move |store, _plan| async move {
            let previous = store.find_scored_question(question_id).await?;
            let winners: Vec<String> = ResponseLedger::new(store.clone(), retry)
                .by_question(question_id)
                .await?
                .into_iter()
                .filter(|response| response.selected_option == answer)
                .map(|response| response.username)
                .collect();

            let outcome = retry
                .run("award_points", || {
                    store.award_points(question_id, answer, winners.clone())
                })
                .await?;
            Ok((outcome, previous))
        })
        .await;

    match result {
        Ok(((outcome, previous), room)) => {
            let AwardOutcome {
                marker,
                newly_credited,
            } = outcome;
            match previous {
                None => info!(
                    question_id,
                    answer = %answer,
                    correct_count = marker.correct_count,
                    "question closed and scored"
                ),
                Some(ref previous) => warn!(
                    question_id,
                    answer = %answer,
                    previous_answer = %previous.answer,
                    newly_credited,
                    "question regraded; earlier points are kept"
                ),
            }
            Ok(CloseQuestionResponse {
                question_id,
                answer,
                recorded_answer: marker.answer,
                correct_count: marker.correct_count,
                regraded: previous.is_some(),
                already_closed: false,
                room: RoomView::from(&room),
            })
        }
        Err(ServiceError::Conflict(
            conflict @ (StateConflict::NotActive | StateConflict::QuestionMismatch { .. }),
        )) => {
            let store = state.require_room_store().await?;
            let Some(marker) = store.find_scored_question(question_id).await? else {
                return Err(conflict.into());
            };

            info!(question_id, "question already closed; nothing to do");
            let room = state.load_room().await?;
            Ok(CloseQuestionResponse {
                question_id,
                answer,
                recorded_answer: marker.answer,
                correct_count: marker.correct_count,
                regraded: false,
                already_closed: true,
                room: RoomView::from(&room),
            })
        }
        Err(err) => Err(err),
    }
}

/// Step to the neighbouring question, stopping any open vote without grading it.
pub async fn advance(
    state: &SharedState,
    _token: &PresenterToken,
    direction: Direction,
) -> Result<RoomView, ServiceError> {
    let ((), room) = state
        .run_transition(RoomEvent::Advance(direction), |_, _| async { Ok(()) })
        .await?;

    info!(
        ?direction,
        question_id = room.state.current_question_id,
        "moved to question"
    );
    Ok(RoomView::from(&room))
}

/// Drop every participant, response and score, and return the room to question 1.
pub async fn reset(state: &SharedState, _token: &PresenterToken) -> Result<RoomView, ServiceError> {
    let retry = state.config().retry;

    let ((), room) = state
        .run_transition(RoomEvent::Reset, move |store: Arc<dyn RoomStore>, plan| async move {
            let initial = plan.next;
            retry
                .run("purge", || store.purge(initial.clone()))
                .await?;
            Ok(())
        })
        .await?;

    info!("room reset");
    Ok(RoomView::from(&room))
}
