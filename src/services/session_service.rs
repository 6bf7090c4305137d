//! Participant operations: joining the room, answering, and reading one's
//! own result. None of them take the transition gate.

use tracing::{debug, info};

use crate::{
    dao::models::{AnswerOption, ParticipantEntity, RoomStateEntity},
    dto::{
        student::{AnswerResponse, JoinResponse, ParticipantResult, RankResponse},
        validation::validate_username,
    },
    error::ServiceError,
    services::standings::{Standing, rank_participants},
    state::{RoomPhase, RoomSnapshot, SharedState, StateConflict},
};

/// Trim a username and check it is acceptable.
pub fn normalize_username(raw: &str) -> Result<String, ServiceError> {
    validate_username(raw).map_err(|err| {
        ServiceError::Validation(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| err.code.into_owned()),
        )
    })?;
    Ok(raw.trim().to_owned())
}

/// Register a participant; joining twice under the same name is a no-op.
pub async fn join(state: &SharedState, username: &str) -> Result<JoinResponse, ServiceError> {
    let username = normalize_username(username)?;
    let store = state.require_room_store().await?;

    let candidate = ParticipantEntity {
        username: username.clone(),
        score: 0,
        joined_at: state.now(),
    };
    let created = state
        .config()
        .retry
        .run("insert_participant", || {
            store.insert_participant(candidate.clone())
        })
        .await?;

    let participant = store
        .find_participant(username.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("participant `{username}` not found")))?;

    if created {
        info!(username = %participant.username, "participant joined");
    } else {
        debug!(username = %participant.username, "participant rejoined");
    }

    Ok(JoinResponse::new(participant, created))
}

/// Record `option` as the participant's answer to the open question.
pub async fn submit_answer(
    state: &SharedState,
    username: &str,
    option: AnswerOption,
) -> Result<AnswerResponse, ServiceError> {
    let username = normalize_username(username)?;
    let room = state.load_room().await?;
    ensure_accepting_answers(&room)?;

    let store = state.require_room_store().await?;
    if store.find_participant(username.clone()).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "participant `{username}` has not joined"
        )));
    }

    let question_id = room.state.current_question_id;
    let response = state
        .ledger()
        .await?
        .submit(question_id, &username, option, room.observed_at)
        .await?;

    debug!(%username, question_id, option = %option, "answer recorded");
    Ok(response.into())
}

fn ensure_accepting_answers(room: &RoomSnapshot) -> Result<(), StateConflict> {
    if !room.state.is_active {
        return Err(StateConflict::VotingClosed);
    }
    if room.remaining_seconds() == 0 {
        return Err(StateConflict::WindowExpired);
    }
    Ok(())
}

/// The participant's answer to a question, its correctness, score and rank.
///
/// Without `question_id` the last closed question is reported.
pub async fn result_for(
    state: &SharedState,
    username: &str,
    question_id: Option<u32>,
) -> Result<ParticipantResult, ServiceError> {
    let username = normalize_username(username)?;
    if let Some(question_id) = question_id {
        ensure_question_id(question_id)?;
    }
    let store = state.require_room_store().await?;
    let room = state.load_room().await?;
    let standing = standing_of(state, &username).await?;

    let question_id = question_id.or_else(|| previous_question(&room.state));
    let Some(question_id) = question_id else {
        return Ok(ParticipantResult {
            username,
            question_id: None,
            selected_option: None,
            correct_answer: None,
            is_correct: None,
            score: standing.participant.score,
            rank: standing.rank,
        });
    };

    let selected_option = state
        .ledger()
        .await?
        .find(question_id, &username)
        .await?
        .map(|response| response.selected_option);

    // The room's revealed answer wins; older questions use their marker.
    let correct_answer = match room.phase() {
        RoomPhase::Closed {
            question_id: closed,
            answer,
        } if closed == question_id => Some(answer),
        _ => store
            .find_scored_question(question_id)
            .await?
            .map(|marker| marker.answer),
    };
    let is_correct = correct_answer.map(|answer| selected_option == Some(answer));

    Ok(ParticipantResult {
        username,
        question_id: Some(question_id),
        selected_option,
        correct_answer,
        is_correct,
        score: standing.participant.score,
        rank: standing.rank,
    })
}

/// Leaderboard position of one participant.
pub async fn rank(state: &SharedState, username: &str) -> Result<RankResponse, ServiceError> {
    let username = normalize_username(username)?;
    let store = state.require_room_store().await?;
    let standings = rank_participants(store.list_participants().await?);
    let participants = standings.len();

    let standing = standings
        .into_iter()
        .find(|standing| standing.participant.username == username)
        .ok_or_else(|| ServiceError::NotFound(format!("participant `{username}` not found")))?;

    Ok(RankResponse {
        username,
        score: standing.participant.score,
        rank: standing.rank,
        participants,
    })
}

async fn standing_of(state: &SharedState, username: &str) -> Result<Standing, ServiceError> {
    let store = state.require_room_store().await?;
    rank_participants(store.list_participants().await?)
        .into_iter()
        .find(|standing| standing.participant.username == username)
        .ok_or_else(|| ServiceError::NotFound(format!("participant `{username}` not found")))
}

/// Question ids start at 1.
pub fn ensure_question_id(question_id: u32) -> Result<(), ServiceError> {
    if question_id == 0 {
        return Err(ServiceError::Validation(
            "question_id must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

fn previous_question(room: &RoomStateEntity) -> Option<u32> {
    room.current_question_id.checked_sub(1).filter(|id| *id >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_trimmed() {
        assert_eq!(normalize_username("  alice ").unwrap(), "alice");
        assert!(matches!(
            normalize_username("   "),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn question_zero_is_rejected() {
        assert!(matches!(
            ensure_question_id(0),
            Err(ServiceError::Validation(_))
        ));
        assert!(ensure_question_id(1).is_ok());
    }

    #[test]
    fn first_question_has_no_previous() {
        let mut room = RoomStateEntity::initial(60);
        assert_eq!(previous_question(&room), None);
        room.current_question_id = 4;
        assert_eq!(previous_question(&room), Some(3));
    }
}
