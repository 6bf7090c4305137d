//! Service helpers that expose read-only public projections of the room.

use crate::{
    dto::{
        public::{LeaderboardEntry, LeaderboardResponse, TallyResponse},
        room::RoomView,
    },
    error::ServiceError,
    services::{session_service::ensure_question_id, standings::rank_participants},
    state::SharedState,
};

/// Room record with its derived timer fields.
pub async fn room_view(state: &SharedState) -> Result<RoomView, ServiceError> {
    let room = state.load_room().await?;
    Ok(RoomView::from(&room))
}

/// Top `limit` participants by score (configured default when omitted, capped).
pub async fn leaderboard(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<LeaderboardResponse, ServiceError> {
    let limit = state.config().resolve_leaderboard_limit(limit);
    let store = state.require_room_store().await?;
    let standings = rank_participants(store.list_participants().await?);
    let total_participants = standings.len();

    let entries = standings
        .into_iter()
        .take(limit)
        .map(|standing| LeaderboardEntry {
            rank: standing.rank,
            username: standing.participant.username,
            score: standing.participant.score,
        })
        .collect();

    Ok(LeaderboardResponse {
        entries,
        total_participants,
    })
}

/// Vote distribution for `question_id`, or for the current question when omitted.
pub async fn tally(
    state: &SharedState,
    question_id: Option<u32>,
) -> Result<TallyResponse, ServiceError> {
    let question_id = match question_id {
        Some(id) => {
            ensure_question_id(id)?;
            id
        }
        None => state.load_room().await?.state.current_question_id,
    };
    let tally = state.ledger().await?.tally(question_id).await?;
    Ok(tally.into())
}
