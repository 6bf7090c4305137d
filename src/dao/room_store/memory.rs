//! Process-local [`RoomStore`] used when no database is configured, and by tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::{
    sync::{RwLock, RwLockWriteGuard},
    time::timeout,
};

use crate::dao::{
    models::{
        AnswerOption, AwardOutcome, ParticipantEntity, ResponseEntity, RoomStateEntity,
        RoomStatePatch, ScoredQuestionEntity,
    },
    room_store::RoomStore,
    storage::{StorageError, StorageResult},
};

/// How long a writer waits for exclusive access before reporting contention.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(50);

/// In-memory store. Writes that touch shared aggregates wait at most
/// `lock_wait` for exclusive access and fail with
/// [`StorageError::Contended`] afterwards, like a database busy timeout.
/// Readers share the locks and never hold writers out for long.
#[derive(Clone)]
pub struct MemoryRoomStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    room: RwLock<Option<RoomStateEntity>>,
    roster: RwLock<Roster>,
    responses: DashMap<(u32, String), ResponseEntity>,
    lock_wait: Duration,
}

#[derive(Default)]
struct Roster {
    participants: IndexMap<String, ParticipantEntity>,
    scored: IndexMap<u32, ScoredQuestionEntity>,
    /// Usernames already credited, per question.
    credited: HashMap<u32, HashSet<String>>,
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRoomStore {
    /// Empty store with the default lock wait.
    pub fn new() -> Self {
        Self::with_lock_wait(DEFAULT_LOCK_WAIT)
    }

    /// Empty store whose writers give up after `lock_wait`.
    pub fn with_lock_wait(lock_wait: Duration) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                room: RwLock::new(None),
                roster: RwLock::new(Roster::default()),
                responses: DashMap::new(),
                lock_wait,
            }),
        }
    }
}

impl MemoryInner {
    async fn write_roster(&self) -> StorageResult<RwLockWriteGuard<'_, Roster>> {
        timeout(self.lock_wait, self.roster.write())
            .await
            .map_err(|_| StorageError::contended("participants table is locked"))
    }

    async fn load_room_state(&self, default_duration: u32) -> StorageResult<RoomStateEntity> {
        if let Some(state) = self.room.read().await.as_ref() {
            return Ok(state.clone());
        }

        let mut guard = timeout(self.lock_wait, self.room.write())
            .await
            .map_err(|_| StorageError::contended("room state is locked"))?;
        Ok(guard
            .get_or_insert_with(|| RoomStateEntity::initial(default_duration))
            .clone())
    }

    async fn update_room_state(&self, patch: RoomStatePatch) -> StorageResult<RoomStateEntity> {
        let mut guard = timeout(self.lock_wait, self.room.write())
            .await
            .map_err(|_| StorageError::contended("room state is locked"))?;
        let state = guard.get_or_insert_with(|| {
            RoomStateEntity::initial(
                patch
                    .duration_seconds
                    .unwrap_or(crate::config::DEFAULT_DURATION_SECONDS),
            )
        });
        state.apply(&patch);
        Ok(state.clone())
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> StorageResult<bool> {
        let mut roster = self.write_roster().await?;
        if roster.participants.contains_key(&participant.username) {
            return Ok(false);
        }
        roster
            .participants
            .insert(participant.username.clone(), participant);
        Ok(true)
    }

    async fn award_points(
        &self,
        question_id: u32,
        answer: AnswerOption,
        winners: Vec<String>,
    ) -> StorageResult<AwardOutcome> {
        let mut roster = self.write_roster().await?;
        let Roster {
            participants,
            scored,
            credited,
        } = &mut *roster;
        let credited = credited.entry(question_id).or_default();

        let mut correct_count = 0;
        let mut newly_credited = 0;
        for username in winners {
            let Some(participant) = participants.get_mut(&username) else {
                continue;
            };
            correct_count += 1;
            if credited.insert(username) {
                participant.score = participant.score.saturating_add(1);
                newly_credited += 1;
            }
        }

        let marker = ScoredQuestionEntity {
            question_id,
            answer,
            correct_count,
            scored_at: SystemTime::now(),
        };
        scored.insert(question_id, marker.clone());
        Ok(AwardOutcome {
            marker,
            newly_credited,
        })
    }

    async fn purge(&self, initial: RoomStateEntity) -> StorageResult<()> {
        let mut roster = self.write_roster().await?;
        let mut room = timeout(self.lock_wait, self.room.write())
            .await
            .map_err(|_| StorageError::contended("room state is locked"))?;

        roster.participants.clear();
        roster.scored.clear();
        roster.credited.clear();
        self.responses.clear();
        *room = Some(initial);
        Ok(())
    }
}

impl RoomStore for MemoryRoomStore {
    fn load_room_state(
        &self,
        default_duration: u32,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>> {
        let store = self.clone();
        Box::pin(async move { store.inner.load_room_state(default_duration).await })
    }

    fn update_room_state(
        &self,
        patch: RoomStatePatch,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>> {
        let store = self.clone();
        Box::pin(async move { store.inner.update_room_state(patch).await })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.inner.insert_participant(participant).await })
    }

    fn find_participant(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let roster = store.inner.roster.read().await;
            Ok(roster.participants.get(&username).cloned())
        })
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let roster = store.inner.roster.read().await;
            Ok(roster.participants.values().cloned().collect())
        })
    }

    fn upsert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = (response.question_id, response.username.clone());
            store.inner.responses.insert(key, response);
            Ok(())
        })
    }

    fn responses_for_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<ResponseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut responses: Vec<ResponseEntity> = store
                .inner
                .responses
                .iter()
                .filter(|entry| entry.key().0 == question_id)
                .map(|entry| entry.value().clone())
                .collect();
            responses.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
            Ok(responses)
        })
    }

    fn find_response(
        &self,
        question_id: u32,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .responses
                .get(&(question_id, username))
                .map(|entry| entry.value().clone()))
        })
    }

    fn award_points(
        &self,
        question_id: u32,
        answer: AnswerOption,
        winners: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<AwardOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.inner.award_points(question_id, answer, winners).await })
    }

    fn find_scored_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Option<ScoredQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let roster = store.inner.roster.read().await;
            Ok(roster.scored.get(&question_id).cloned())
        })
    }

    fn purge(&self, initial: RoomStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.purge(initial).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
