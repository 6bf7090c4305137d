pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    AnswerOption, AwardOutcome, ParticipantEntity, ResponseEntity, RoomStateEntity,
    RoomStatePatch, ScoredQuestionEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer holding the room record, the
/// participants and the response ledger.
///
/// Writers may see [`StorageError::Contended`](crate::dao::storage::StorageError::Contended)
/// when the backend cannot grant exclusive access; callers retry those.
pub trait RoomStore: Send + Sync {
    /// Read the room record, creating it with `default_duration` when missing.
    fn load_room_state(
        &self,
        default_duration: u32,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>>;
    /// Write only the fields the patch carries and return the resulting record.
    fn update_room_state(
        &self,
        patch: RoomStatePatch,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>>;

    /// Insert the participant unless the username exists. Returns `true` when inserted.
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_participant(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Every participant, in join order.
    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;

    /// Upsert keyed by `(question_id, username)`; the latest write wins.
    fn upsert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn responses_for_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<ResponseEntity>>>;
    fn find_response(
        &self,
        question_id: u32,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>>;

    /// Give one point to each of `winners` not yet credited for `question_id`,
    /// then record the grading marker. Safe to retry with the same arguments.
    fn award_points(
        &self,
        question_id: u32,
        answer: AnswerOption,
        winners: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<AwardOutcome>>;
    fn find_scored_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Option<ScoredQuestionEntity>>>;

    /// Drop participants, responses and grading markers, and rewrite the room record.
    fn purge(&self, initial: RoomStateEntity) -> BoxFuture<'static, StorageResult<()>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
