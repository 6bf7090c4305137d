use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::{
        public::{LeaderboardQuery, LeaderboardResponse, TallyResponse},
        room::RoomView,
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Read-only endpoints polled by the presenter screen and participants.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/room", get(get_room))
        .route("/public/leaderboard", get(get_leaderboard))
        .route("/public/tally", get(get_current_tally))
        .route("/public/tally/{question_id}", get(get_tally))
}

/// Current room state with the remaining voting time.
#[utoipa::path(
    get,
    path = "/public/room",
    tag = "public",
    responses(
        (status = 200, description = "Room state", body = RoomView),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_room(State(state): State<SharedState>) -> Result<Json<RoomView>, AppError> {
    Ok(Json(public_service::room_view(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/leaderboard",
    tag = "public",
    params(LeaderboardQuery),
    responses((status = 200, description = "Top participants by score", body = LeaderboardResponse))
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(public_service::leaderboard(&state, query.limit).await?))
}

/// Vote distribution of the current question.
#[utoipa::path(
    get,
    path = "/public/tally",
    tag = "public",
    responses((status = 200, description = "Votes per option", body = TallyResponse))
)]
pub async fn get_current_tally(
    State(state): State<SharedState>,
) -> Result<Json<TallyResponse>, AppError> {
    Ok(Json(public_service::tally(&state, None).await?))
}

#[utoipa::path(
    get,
    path = "/public/tally/{question_id}",
    tag = "public",
    params(("question_id" = u32, Path, description = "Question to count votes for (1 or more)")),
    responses(
        (status = 200, description = "Votes per option", body = TallyResponse),
        (status = 400, description = "Invalid question id")
    )
)]
pub async fn get_tally(
    State(state): State<SharedState>,
    Path(question_id): Path<u32>,
) -> Result<Json<TallyResponse>, AppError> {
    Ok(Json(public_service::tally(&state, Some(question_id)).await?))
}
