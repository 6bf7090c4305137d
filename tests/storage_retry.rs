use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use quiz_room_back::{
    config::AppConfig,
    dao::{
        models::{
            AnswerOption, AwardOutcome, ParticipantEntity, ResponseEntity, RoomStateEntity,
            RoomStatePatch, ScoredQuestionEntity,
        },
        retry::RetryPolicy,
        room_store::{RoomStore, memory::MemoryRoomStore},
        storage::{StorageError, StorageResult},
    },
    error::{AppError, ServiceError},
    services::{admin_service, public_service, session_service},
    state::{AppState, PresenterToken, SharedState},
};

/// Memory store whose response writes report contention a set number of
/// times, and whose grading writes can land but still report contention.
#[derive(Clone)]
struct FlakyStore {
    inner: MemoryRoomStore,
    failures_left: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
    lost_award_acks: Arc<AtomicU32>,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryRoomStore::new(),
            failures_left: Arc::new(AtomicU32::new(failures)),
            attempts: Arc::new(AtomicU32::new(0)),
            lost_award_acks: Arc::new(AtomicU32::new(0)),
        }
    }

    fn losing_award_acks(acks: u32) -> Self {
        let store = Self::new(0);
        store.lost_award_acks.store(acks, Ordering::SeqCst);
        store
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

impl RoomStore for FlakyStore {
    fn load_room_state(
        &self,
        default_duration: u32,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>> {
        self.inner.load_room_state(default_duration)
    }

    fn update_room_state(
        &self,
        patch: RoomStatePatch,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>> {
        self.inner.update_room_state(patch)
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.insert_participant(participant)
    }

    fn find_participant(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        self.inner.find_participant(username)
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        self.inner.list_participants()
    }

    fn upsert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failures_left) {
            return Box::pin(async { Err(StorageError::contended("responses table is locked")) });
        }
        self.inner.upsert_response(response)
    }

    fn responses_for_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<ResponseEntity>>> {
        self.inner.responses_for_question(question_id)
    }

    fn find_response(
        &self,
        question_id: u32,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>> {
        self.inner.find_response(question_id, username)
    }

    fn award_points(
        &self,
        question_id: u32,
        answer: AnswerOption,
        winners: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<AwardOutcome>> {
        let write = self.inner.award_points(question_id, answer, winners);
        let lose_ack = take_one(&self.lost_award_acks);
        Box::pin(async move {
            let outcome = write.await?;
            if lose_ack {
                return Err(StorageError::contended("write conflict after grading"));
            }
            Ok(outcome)
        })
    }

    fn find_scored_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Option<ScoredQuestionEntity>>> {
        self.inner.find_scored_question(question_id)
    }

    fn purge(&self, initial: RoomStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.purge(initial)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

async fn open_room_with(store: FlakyStore) -> SharedState {
    let config = AppConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: Duration::from_millis(1),
        },
        ..AppConfig::default()
    };
    let state = AppState::new(config);
    state.install_room_store(Arc::new(store)).await;

    session_service::join(&state, "alice").await.unwrap();
    admin_service::open_question(&state, &PresenterToken::issue(), None)
        .await
        .unwrap();
    state
}

#[tokio::test]
async fn contended_write_succeeds_within_budget() {
    let store = FlakyStore::new(2);
    let attempts = store.attempts.clone();
    let state = open_room_with(store).await;

    session_service::submit_answer(&state, "alice", AnswerOption::B)
        .await
        .unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let tally = public_service::tally(&state, Some(1)).await.unwrap();
    assert_eq!(tally.total, 1);
}

#[tokio::test]
async fn persistent_contention_surfaces_write_failed() {
    let store = FlakyStore::new(u32::MAX);
    let attempts = store.attempts.clone();
    let state = open_room_with(store).await;

    let err = session_service::submit_answer(&state, "alice", AnswerOption::B)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::WriteFailed { attempts: 3 }));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    match AppError::from(err) {
        AppError::ServiceUnavailable(message) => assert!(message.contains("try again")),
        other => panic!("unexpected mapping: {other:?}"),
    }

    let tally = public_service::tally(&state, Some(1)).await.unwrap();
    assert_eq!(tally.total, 0);
}

#[tokio::test]
async fn retried_grading_credits_each_winner_once() {
    let state = open_room_with(FlakyStore::losing_award_acks(2)).await;
    let token = PresenterToken::issue();

    session_service::submit_answer(&state, "alice", AnswerOption::B)
        .await
        .unwrap();
    let closed = admin_service::close_question(&state, &token, 1, AnswerOption::B)
        .await
        .unwrap();
    assert_eq!(closed.correct_count, 1);
    assert!(!closed.regraded);
    assert_eq!(closed.room.current_question_id, 2);

    let rank = session_service::rank(&state, "alice").await.unwrap();
    assert_eq!(rank.score, 1);
}
