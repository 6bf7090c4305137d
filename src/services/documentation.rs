use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Room Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_room,
        crate::routes::public::get_leaderboard,
        crate::routes::public::get_current_tally,
        crate::routes::public::get_tally,
        crate::routes::student::join,
        crate::routes::student::submit_answer,
        crate::routes::student::get_result,
        crate::routes::student::get_rank,
        crate::routes::admin::open_question,
        crate::routes::admin::close_question,
        crate::routes::admin::advance,
        crate::routes::admin::reset,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::RoomView,
            crate::dto::room::VisibleRoomPhase,
            crate::dto::public::LeaderboardResponse,
            crate::dto::public::LeaderboardEntry,
            crate::dto::public::TallyResponse,
            crate::dto::public::OptionCountDto,
            crate::dto::student::JoinRequest,
            crate::dto::student::JoinResponse,
            crate::dto::student::AnswerRequest,
            crate::dto::student::AnswerResponse,
            crate::dto::student::ParticipantResult,
            crate::dto::student::RankResponse,
            crate::dto::admin::OpenQuestionRequest,
            crate::dto::admin::CloseQuestionRequest,
            crate::dto::admin::CloseQuestionResponse,
            crate::dto::admin::AdvanceRequest,
            crate::dto::admin::AdvanceDirection,
            crate::dao::models::AnswerOption,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only room projections for pollers"),
        (name = "student", description = "Participant operations"),
        (name = "admin", description = "Presenter controls (require the X-Admin-Token header)"),
    )
)]
pub struct ApiDoc;
