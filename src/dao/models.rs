use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One of the four answer letters a multiple-choice question offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    /// Every option in display order.
    pub const ALL: [AnswerOption; 4] = [
        AnswerOption::A,
        AnswerOption::B,
        AnswerOption::C,
        AnswerOption::D,
    ];

    /// Single-letter label used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single shared room record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomStateEntity {
    /// Question currently presented (starts at 1).
    pub current_question_id: u32,
    /// Whether the voting window is open.
    pub is_active: bool,
    /// Answer revealed by the last close, cleared when voting reopens.
    pub correct_answer: Option<AnswerOption>,
    /// When voting opened for the current attempt.
    pub start_time: Option<SystemTime>,
    /// Length of the voting window, fixed at open time.
    pub duration_seconds: u32,
}

impl RoomStateEntity {
    /// Record a freshly initialised (or reset) room holds.
    pub fn initial(duration_seconds: u32) -> Self {
        Self {
            current_question_id: 1,
            is_active: false,
            correct_answer: None,
            start_time: None,
            duration_seconds,
        }
    }

    /// Apply a partial update, touching only the fields the patch carries.
    pub fn apply(&mut self, patch: &RoomStatePatch) {
        if let Some(question_id) = patch.current_question_id {
            self.current_question_id = question_id;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(answer) = patch.correct_answer {
            self.correct_answer = answer;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(duration) = patch.duration_seconds {
            self.duration_seconds = duration;
        }
    }
}

/// Partial update of [`RoomStateEntity`].
///
/// `None` leaves a field untouched; for nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomStatePatch {
    pub current_question_id: Option<u32>,
    pub is_active: Option<bool>,
    pub correct_answer: Option<Option<AnswerOption>>,
    pub start_time: Option<Option<SystemTime>>,
    pub duration_seconds: Option<u32>,
}

impl RoomStatePatch {
    /// Patch that rewrites every field to the given record.
    pub fn replace_with(state: &RoomStateEntity) -> Self {
        Self {
            current_question_id: Some(state.current_question_id),
            is_active: Some(state.is_active),
            correct_answer: Some(state.correct_answer),
            start_time: Some(state.start_time),
            duration_seconds: Some(state.duration_seconds),
        }
    }

    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A quiz participant and their running score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Case-sensitive unique name.
    pub username: String,
    /// Number of questions answered correctly so far.
    pub score: u32,
    /// First successful join, used to break leaderboard ties.
    pub joined_at: SystemTime,
}

/// A participant's answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEntity {
    pub question_id: u32,
    pub username: String,
    pub selected_option: AnswerOption,
    pub submitted_at: SystemTime,
}

/// Marker written once a question has been graded.
///
/// Grading the same question again (after a rewind) overwrites it with the
/// latest answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredQuestionEntity {
    pub question_id: u32,
    /// Answer the question was last graded against.
    pub answer: AnswerOption,
    /// Participants whose response matched `answer`.
    pub correct_count: u32,
    pub scored_at: SystemTime,
}

/// Result of asking the store to grade a question.
///
/// A participant earns at most one point per question, so repeating or
/// retrying a grading only credits winners that were not credited yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    /// Marker as stored after this grading.
    pub marker: ScoredQuestionEntity,
    /// Winners whose score moved during this call.
    pub newly_credited: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_touches_only_given_fields() {
        let mut state = RoomStateEntity::initial(60);
        state.apply(&RoomStatePatch {
            is_active: Some(true),
            start_time: Some(Some(SystemTime::UNIX_EPOCH)),
            ..Default::default()
        });

        assert!(state.is_active);
        assert_eq!(state.start_time, Some(SystemTime::UNIX_EPOCH));
        assert_eq!(state.current_question_id, 1);
        assert_eq!(state.duration_seconds, 60);

        state.apply(&RoomStatePatch {
            start_time: Some(None),
            ..Default::default()
        });
        assert_eq!(state.start_time, None);
        assert!(state.is_active);
    }
}
