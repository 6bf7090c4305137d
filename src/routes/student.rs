use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::student::{
        AnswerRequest, AnswerResponse, JoinRequest, JoinResponse, ParticipantResult,
        RankResponse, ResultQuery,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Participant endpoints. Identification is by username only.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/student/join", post(join))
        .route("/student/answer", post(submit_answer))
        .route("/student/{username}/result", get(get_result))
        .route("/student/{username}/rank", get(get_rank))
}

/// Join the room; joining again under the same name is a no-op.
#[utoipa::path(
    post,
    path = "/student/join",
    tag = "student",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Participant registered", body = JoinResponse),
        (status = 400, description = "Invalid username")
    )
)]
pub async fn join(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinRequest>>,
) -> Result<Json<JoinResponse>, AppError> {
    Ok(Json(session_service::join(&state, &payload.username).await?))
}

/// Answer the question currently open; a later answer replaces the earlier one.
#[utoipa::path(
    post,
    path = "/student/answer",
    tag = "student",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerResponse),
        (status = 404, description = "Participant has not joined"),
        (status = 409, description = "Voting is closed or the window expired"),
        (status = 503, description = "Storage busy or unavailable")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<AnswerResponse>, AppError> {
    Ok(Json(
        session_service::submit_answer(&state, &payload.username, payload.option).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/student/{username}/result",
    tag = "student",
    params(
        ("username" = String, Path, description = "Participant name"),
        ResultQuery
    ),
    responses(
        (status = 200, description = "Own answer, correctness, score and rank", body = ParticipantResult),
        (status = 400, description = "Invalid question id"),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn get_result(
    State(state): State<SharedState>,
    Path(username): Path<String>,
    Valid(Query(query)): Valid<Query<ResultQuery>>,
) -> Result<Json<ParticipantResult>, AppError> {
    Ok(Json(
        session_service::result_for(&state, &username, query.question_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/student/{username}/rank",
    tag = "student",
    params(("username" = String, Path, description = "Participant name")),
    responses(
        (status = 200, description = "Leaderboard position", body = RankResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn get_rank(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<RankResponse>, AppError> {
    Ok(Json(session_service::rank(&state, &username).await?))
}
