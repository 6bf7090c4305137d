use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoParticipantDocument, MongoResponseDocument, MongoRoomDocument, MongoScoredDocument,
        patch_fields, response_key, room_fields, room_id, scored_id,
    },
};
use crate::dao::{
    models::{
        AnswerOption, AwardOutcome, ParticipantEntity, ResponseEntity, RoomStateEntity,
        RoomStatePatch, ScoredQuestionEntity,
    },
    room_store::RoomStore,
    storage::StorageResult,
};

const ROOM_COLLECTION_NAME: &str = "room_state";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const RESPONSE_COLLECTION_NAME: &str = "responses";
const SCORED_COLLECTION_NAME: &str = "scored_questions";

/// MongoDB-backed [`RoomStore`].
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let responses = self.responses().await;
        let index = IndexModel::builder()
            .keys(doc! {"question_id": 1, "username": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("response_key_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        responses
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RESPONSE_COLLECTION_NAME,
                index: "question_id,username",
                source,
            })?;

        let participants = self.participants().await;
        let index = IndexModel::builder()
            .keys(doc! {"joined_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_joined_idx".to_owned()))
                    .build(),
            )
            .build();
        participants
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "joined_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn room(&self) -> Collection<MongoRoomDocument> {
        self.database()
            .await
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn participants(&self) -> Collection<MongoParticipantDocument> {
        self.database()
            .await
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn responses(&self) -> Collection<MongoResponseDocument> {
        self.database()
            .await
            .collection::<MongoResponseDocument>(RESPONSE_COLLECTION_NAME)
    }

    async fn scored(&self) -> Collection<MongoScoredDocument> {
        self.database()
            .await
            .collection::<MongoScoredDocument>(SCORED_COLLECTION_NAME)
    }

    async fn load_room_state(&self, default_duration: u32) -> MongoResult<RoomStateEntity> {
        let collection = self.room().await;
        if let Some(document) = collection
            .find_one(room_id())
            .await
            .map_err(|source| MongoDaoError::LoadRoom { source })?
        {
            return Ok(document.into());
        }

        // Concurrent first readers race on the upsert; the loser sees a
        // duplicate key error, reported as contention and retried.
        let initial = RoomStateEntity::initial(default_duration);
        let document = collection
            .find_one_and_update(room_id(), doc! {"$setOnInsert": room_fields(&initial)})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::LoadRoom { source })?
            .ok_or(MongoDaoError::MissingRoom)?;
        Ok(document.into())
    }

    async fn update_room_state(&self, patch: RoomStatePatch) -> MongoResult<RoomStateEntity> {
        let collection = self.room().await;
        let document = if patch.is_empty() {
            collection
                .find_one(room_id())
                .await
                .map_err(|source| MongoDaoError::LoadRoom { source })?
        } else {
            collection
                .find_one_and_update(room_id(), doc! {"$set": patch_fields(&patch)})
                .return_document(ReturnDocument::After)
                .await
                .map_err(|source| MongoDaoError::UpdateRoom { source })?
        };

        document
            .map(Into::into)
            .ok_or(MongoDaoError::MissingRoom)
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> MongoResult<bool> {
        let username = participant.username.clone();
        let document: MongoParticipantDocument = participant.into();
        match self.participants().await.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::SaveParticipant { username, source }),
        }
    }

    async fn find_participant(&self, username: String) -> MongoResult<Option<ParticipantEntity>> {
        let document = self
            .participants()
            .await
            .find_one(doc! {"_id": username.as_str()})
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { source })?;
        Ok(document.map(Into::into))
    }

    async fn list_participants(&self) -> MongoResult<Vec<ParticipantEntity>> {
        let documents: Vec<MongoParticipantDocument> = self
            .participants()
            .await
            .find(doc! {})
            .sort(doc! {"joined_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn upsert_response(&self, response: ResponseEntity) -> MongoResult<()> {
        let question_id = response.question_id;
        let username = response.username.clone();
        let document: MongoResponseDocument = response.into();

        self.responses()
            .await
            .replace_one(response_key(question_id, &username), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveResponse {
                question_id,
                username,
                source,
            })?;
        Ok(())
    }

    async fn responses_for_question(&self, question_id: u32) -> MongoResult<Vec<ResponseEntity>> {
        let documents: Vec<MongoResponseDocument> = self
            .responses()
            .await
            .find(doc! {"question_id": i64::from(question_id)})
            .sort(doc! {"submitted_at": 1})
            .await
            .map_err(|source| MongoDaoError::LoadResponses {
                question_id,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadResponses {
                question_id,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_response(
        &self,
        question_id: u32,
        username: String,
    ) -> MongoResult<Option<ResponseEntity>> {
        let document = self
            .responses()
            .await
            .find_one(response_key(question_id, &username))
            .await
            .map_err(|source| MongoDaoError::LoadResponses {
                question_id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    /// Each participant document lists the questions it was credited for, and
    /// the increment skips documents that already list `question_id`. Every
    /// step can therefore be replayed after a conflict or a dropped future
    /// without losing or doubling a point. The marker is written last.
    async fn award_points(
        &self,
        question_id: u32,
        answer: AnswerOption,
        winners: Vec<String>,
    ) -> MongoResult<AwardOutcome> {
        let scored_question = i64::from(question_id);
        let (correct_count, newly_credited) = if winners.is_empty() {
            (0, 0)
        } else {
            let participants = self.participants().await;
            let result = participants
                .update_many(
                    doc! {
                        "_id": {"$in": winners.clone()},
                        "scored_questions": {"$ne": scored_question},
                    },
                    doc! {
                        "$inc": {"score": 1},
                        "$addToSet": {"scored_questions": scored_question},
                    },
                )
                .await
                .map_err(|source| MongoDaoError::AwardPoints { question_id, source })?;
            let matched = participants
                .count_documents(doc! {"_id": {"$in": winners}})
                .await
                .map_err(|source| MongoDaoError::AwardPoints { question_id, source })?;
            (
                u32::try_from(matched).unwrap_or(u32::MAX),
                u32::try_from(result.modified_count).unwrap_or(u32::MAX),
            )
        };

        let marker = ScoredQuestionEntity {
            question_id,
            answer,
            correct_count,
            scored_at: SystemTime::now(),
        };
        let document: MongoScoredDocument = marker.clone().into();
        self.scored()
            .await
            .replace_one(scored_id(question_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::AwardPoints { question_id, source })?;

        Ok(AwardOutcome {
            marker,
            newly_credited,
        })
    }

    async fn find_scored_question(
        &self,
        question_id: u32,
    ) -> MongoResult<Option<ScoredQuestionEntity>> {
        let document = self
            .scored()
            .await
            .find_one(scored_id(question_id))
            .await
            .map_err(|source| MongoDaoError::AwardPoints { question_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn purge(&self, initial: RoomStateEntity) -> MongoResult<()> {
        let database = self.database().await;
        for collection in [
            RESPONSE_COLLECTION_NAME,
            PARTICIPANT_COLLECTION_NAME,
            SCORED_COLLECTION_NAME,
        ] {
            database
                .collection::<Document>(collection)
                .delete_many(doc! {})
                .await
                .map_err(|source| MongoDaoError::Purge { collection, source })?;
        }

        self.room()
            .await
            .update_one(room_id(), doc! {"$set": room_fields(&initial)})
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Purge {
                collection: ROOM_COLLECTION_NAME,
                source,
            })?;
        Ok(())
    }
}

impl RoomStore for MongoRoomStore {
    fn load_room_state(
        &self,
        default_duration: u32,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .load_room_state(default_duration)
                .await
                .map_err(Into::into)
        })
    }

    fn update_room_state(
        &self,
        patch: RoomStatePatch,
    ) -> BoxFuture<'static, StorageResult<RoomStateEntity>> {
        let store = self.clone();
        Box::pin(async move { store.update_room_state(patch).await.map_err(Into::into) })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_participant(participant)
                .await
                .map_err(Into::into)
        })
    }

    fn find_participant(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_participant(username).await.map_err(Into::into) })
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants().await.map_err(Into::into) })
    }

    fn upsert_response(&self, response: ResponseEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_response(response).await.map_err(Into::into) })
    }

    fn responses_for_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<ResponseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .responses_for_question(question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_response(
        &self,
        question_id: u32,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<ResponseEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_response(question_id, username)
                .await
                .map_err(Into::into)
        })
    }

    fn award_points(
        &self,
        question_id: u32,
        answer: AnswerOption,
        winners: Vec<String>,
    ) -> BoxFuture<'static, StorageResult<AwardOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .award_points(question_id, answer, winners)
                .await
                .map_err(Into::into)
        })
    }

    fn find_scored_question(
        &self,
        question_id: u32,
    ) -> BoxFuture<'static, StorageResult<Option<ScoredQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_scored_question(question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn purge(&self, initial: RoomStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.purge(initial).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
