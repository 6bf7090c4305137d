use axum::{
    Extension, Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::{
        admin::{AdvanceRequest, CloseQuestionRequest, CloseQuestionResponse, OpenQuestionRequest},
        room::RoomView,
    },
    error::AppError,
    services::admin_service,
    state::{PresenterToken, SharedState},
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Presenter-only endpoints driving the room.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/room/open", post(open_question))
        .route("/admin/room/close", post(close_question))
        .route("/admin/room/advance", post(advance))
        .route("/admin/room/reset", post(reset))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Open voting on the current question.
#[utoipa::path(
    post,
    path = "/admin/room/open",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Presenter token")),
    request_body = OpenQuestionRequest,
    responses(
        (status = 200, description = "Voting opened", body = RoomView),
        (status = 409, description = "Voting is already open")
    )
)]
pub async fn open_question(
    State(state): State<SharedState>,
    Extension(token): Extension<PresenterToken>,
    Valid(Json(payload)): Valid<Json<OpenQuestionRequest>>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(
        admin_service::open_question(&state, &token, payload.duration_seconds).await?,
    ))
}

/// Close voting, reveal the answer and award points. Safe to repeat.
#[utoipa::path(
    post,
    path = "/admin/room/close",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Presenter token")),
    request_body = CloseQuestionRequest,
    responses(
        (status = 200, description = "Question closed (or already closed)", body = CloseQuestionResponse),
        (status = 409, description = "The question is not open")
    )
)]
pub async fn close_question(
    State(state): State<SharedState>,
    Extension(token): Extension<PresenterToken>,
    Valid(Json(payload)): Valid<Json<CloseQuestionRequest>>,
) -> Result<Json<CloseQuestionResponse>, AppError> {
    Ok(Json(
        admin_service::close_question(&state, &token, payload.question_id, payload.answer)
            .await?,
    ))
}

/// Move to the next or previous question without grading.
#[utoipa::path(
    post,
    path = "/admin/room/advance",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Presenter token")),
    request_body = AdvanceRequest,
    responses((status = 200, description = "Question changed", body = RoomView))
)]
pub async fn advance(
    State(state): State<SharedState>,
    Extension(token): Extension<PresenterToken>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(
        admin_service::advance(&state, &token, payload.direction.into()).await?,
    ))
}

/// Wipe participants, answers and scores.
#[utoipa::path(
    post,
    path = "/admin/room/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Presenter token")),
    responses((status = 200, description = "Room reset", body = RoomView))
)]
pub async fn reset(
    State(state): State<SharedState>,
    Extension(token): Extension<PresenterToken>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(admin_service::reset(&state, &token).await?))
}

/// Check the presenter token header and hand a [`PresenterToken`] to the handler.
async fn require_admin_token(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = state.config().admin_token.as_str();
    if expected.is_empty() || provided != expected {
        return Err(AppError::Unauthorized("invalid admin token".into()));
    }

    req.extensions_mut().insert(PresenterToken::issue());
    Ok(next.run(req).await)
}
