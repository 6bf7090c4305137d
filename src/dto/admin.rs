//! DTO definitions used by the presenter REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dao::models::AnswerOption, dto::room::RoomView, state::Direction};

/// Request to open voting on the current question.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct OpenQuestionRequest {
    /// Length of the voting window; the configured default when omitted.
    #[serde(default)]
    #[validate(range(min = 10, max = 3600))]
    pub duration_seconds: Option<u32>,
}

/// Request to close voting and reveal the answer.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CloseQuestionRequest {
    #[validate(range(min = 1))]
    pub question_id: u32,
    pub answer: AnswerOption,
}

/// Navigation direction accepted by the advance endpoint.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceDirection {
    Forward,
    Backward,
}

impl From<AdvanceDirection> for Direction {
    fn from(value: AdvanceDirection) -> Self {
        match value {
            AdvanceDirection::Forward => Direction::Forward,
            AdvanceDirection::Backward => Direction::Backward,
        }
    }
}

/// Request to step to a neighbouring question without grading.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceRequest {
    pub direction: AdvanceDirection,
}

/// Outcome of closing a question.
#[derive(Debug, Serialize, ToSchema)]
pub struct CloseQuestionResponse {
    pub question_id: u32,
    /// Answer named by this request.
    pub answer: AnswerOption,
    /// Answer the question is graded against. Differs from `answer` only when
    /// a repeated close names another letter.
    pub recorded_answer: AnswerOption,
    /// Participants whose response matches `recorded_answer`.
    pub correct_count: u32,
    /// True when an earlier close of this question (before a rewind) was
    /// replaced. Points earned then are kept.
    pub regraded: bool,
    /// True when the question had already been closed and nothing changed.
    pub already_closed: bool,
    pub room: RoomView,
}
