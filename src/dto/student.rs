//! Participant-facing request and response payloads.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{AnswerOption, ParticipantEntity, ResponseEntity},
    dto::{format_system_time, validation::validate_username},
};

/// Request to join the room under a username.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
}

/// Participant as returned by the join endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub username: String,
    pub score: u32,
    pub joined_at: String,
    /// False when the username had already joined; joining again is a no-op.
    pub created: bool,
}

impl JoinResponse {
    pub fn new(participant: ParticipantEntity, created: bool) -> Self {
        Self {
            username: participant.username,
            score: participant.score,
            joined_at: format_system_time(participant.joined_at),
            created,
        }
    }
}

/// Answer submission for the question currently open.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    pub option: AnswerOption,
}

/// Response row as recorded by the ledger.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub question_id: u32,
    pub username: String,
    pub selected_option: AnswerOption,
    pub submitted_at: String,
}

impl From<ResponseEntity> for AnswerResponse {
    fn from(response: ResponseEntity) -> Self {
        Self {
            question_id: response.question_id,
            username: response.username,
            selected_option: response.selected_option,
            submitted_at: format_system_time(response.submitted_at),
        }
    }
}

/// Query parameters of the result endpoint.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ResultQuery {
    /// Question to report on; the last closed question when omitted.
    #[validate(range(min = 1))]
    pub question_id: Option<u32>,
}

/// A participant's own view of a question and their standing.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantResult {
    pub username: String,
    /// Question reported on; absent before any question was closed.
    pub question_id: Option<u32>,
    pub selected_option: Option<AnswerOption>,
    /// Revealed answer, once the question has been graded.
    pub correct_answer: Option<AnswerOption>,
    /// Unknown until the question has been graded.
    pub is_correct: Option<bool>,
    pub score: u32,
    /// 1-based position on the leaderboard.
    pub rank: usize,
}

/// Leaderboard position of a single participant.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankResponse {
    pub username: String,
    pub score: u32,
    pub rank: usize,
    pub participants: usize,
}
