use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{
    AnswerOption, ParticipantEntity, ResponseEntity, RoomStateEntity, RoomStatePatch,
    ScoredQuestionEntity,
};

/// `_id` of the single room document.
pub const ROOM_ID: &str = "room";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: String,
    current_question_id: u32,
    is_active: bool,
    correct_answer: Option<AnswerOption>,
    start_time: Option<DateTime>,
    duration_seconds: u32,
}

impl From<MongoRoomDocument> for RoomStateEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            current_question_id: value.current_question_id,
            is_active: value.is_active,
            correct_answer: value.correct_answer,
            start_time: value.start_time.map(DateTime::to_system_time),
            duration_seconds: value.duration_seconds,
        }
    }
}

/// `$set` body writing every field of `state` except `_id`.
pub fn room_fields(state: &RoomStateEntity) -> Document {
    patch_fields(&RoomStatePatch::replace_with(state))
}

/// `$set` body for the fields a patch carries; cleared fields become `null`.
pub fn patch_fields(patch: &RoomStatePatch) -> Document {
    let mut fields = Document::new();
    if let Some(question_id) = patch.current_question_id {
        fields.insert("current_question_id", i64::from(question_id));
    }
    if let Some(is_active) = patch.is_active {
        fields.insert("is_active", is_active);
    }
    if let Some(answer) = patch.correct_answer {
        fields.insert(
            "correct_answer",
            answer.map_or(Bson::Null, |a| Bson::String(a.as_str().to_owned())),
        );
    }
    if let Some(start_time) = patch.start_time {
        fields.insert(
            "start_time",
            start_time.map_or(Bson::Null, |t| Bson::DateTime(DateTime::from_system_time(t))),
        );
    }
    if let Some(duration) = patch.duration_seconds {
        fields.insert("duration_seconds", i64::from(duration));
    }
    fields
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    username: String,
    score: u32,
    joined_at: DateTime,
    /// Questions this participant already earned a point for.
    #[serde(default)]
    scored_questions: Vec<i64>,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            username: value.username,
            score: value.score,
            joined_at: DateTime::from_system_time(value.joined_at),
            scored_questions: Vec::new(),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            username: value.username,
            score: value.score,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResponseDocument {
    question_id: u32,
    username: String,
    selected_option: AnswerOption,
    submitted_at: DateTime,
}

impl From<ResponseEntity> for MongoResponseDocument {
    fn from(value: ResponseEntity) -> Self {
        Self {
            question_id: value.question_id,
            username: value.username,
            selected_option: value.selected_option,
            submitted_at: DateTime::from_system_time(value.submitted_at),
        }
    }
}

impl From<MongoResponseDocument> for ResponseEntity {
    fn from(value: MongoResponseDocument) -> Self {
        Self {
            question_id: value.question_id,
            username: value.username,
            selected_option: value.selected_option,
            submitted_at: value.submitted_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoredDocument {
    #[serde(rename = "_id")]
    question_id: u32,
    answer: AnswerOption,
    correct_count: u32,
    scored_at: DateTime,
}

impl From<ScoredQuestionEntity> for MongoScoredDocument {
    fn from(value: ScoredQuestionEntity) -> Self {
        Self {
            question_id: value.question_id,
            answer: value.answer,
            correct_count: value.correct_count,
            scored_at: DateTime::from_system_time(value.scored_at),
        }
    }
}

impl From<MongoScoredDocument> for ScoredQuestionEntity {
    fn from(value: MongoScoredDocument) -> Self {
        Self {
            question_id: value.question_id,
            answer: value.answer,
            correct_count: value.correct_count,
            scored_at: value.scored_at.to_system_time(),
        }
    }
}

pub fn room_id() -> Document {
    doc! {"_id": ROOM_ID}
}

pub fn response_key(question_id: u32, username: &str) -> Document {
    doc! {"question_id": i64::from(question_id), "username": username}
}

pub fn scored_id(question_id: u32) -> Document {
    doc! {"_id": i64::from(question_id)}
}
