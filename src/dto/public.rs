use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dao::{
    ledger::{OptionCount, Tally},
    models::AnswerOption,
};

/// Query parameters of the leaderboard endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Number of entries to return (default 10, at most 100).
    pub limit: Option<usize>,
}

/// One leaderboard row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub score: u32,
}

/// Top of the leaderboard, ties broken by join order.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub total_participants: usize,
}

/// Votes for a single option.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct OptionCountDto {
    pub option: AnswerOption,
    pub count: u32,
}

impl From<OptionCount> for OptionCountDto {
    fn from(value: OptionCount) -> Self {
        Self {
            option: value.option,
            count: value.count,
        }
    }
}

/// Vote distribution of one question, always listing A, B, C and D.
#[derive(Debug, Serialize, ToSchema)]
pub struct TallyResponse {
    pub question_id: u32,
    pub counts: Vec<OptionCountDto>,
    pub total: u32,
}

impl From<Tally> for TallyResponse {
    fn from(tally: Tally) -> Self {
        Self {
            question_id: tally.question_id,
            total: tally.total(),
            counts: tally.counts.into_iter().map(Into::into).collect(),
        }
    }
}
