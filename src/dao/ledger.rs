//! Response ledger: one answer per `(question, participant)`, last write wins.

use std::{sync::Arc, time::SystemTime};

use crate::dao::{
    models::{AnswerOption, ResponseEntity},
    retry::{RetryError, RetryPolicy},
    room_store::RoomStore,
    storage::StorageResult,
};

/// Vote count for a single option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionCount {
    pub option: AnswerOption,
    pub count: u32,
}

/// Per-option vote counts for one question, always holding A, B, C and D in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub question_id: u32,
    pub counts: [OptionCount; 4],
}

impl Tally {
    fn empty(question_id: u32) -> Self {
        Self {
            question_id,
            counts: AnswerOption::ALL.map(|option| OptionCount { option, count: 0 }),
        }
    }

    /// Votes across all options.
    pub fn total(&self) -> u32 {
        self.counts.iter().map(|entry| entry.count).sum()
    }
}

/// Write path and tallying over the responses held by a [`RoomStore`].
///
/// Every write goes through the configured [`RetryPolicy`].
#[derive(Clone)]
pub struct ResponseLedger {
    store: Arc<dyn RoomStore>,
    retry: RetryPolicy,
}

impl ResponseLedger {
    pub fn new(store: Arc<dyn RoomStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Record `option` as the answer of `username` to `question_id`, replacing
    /// any earlier answer for the same pair.
    pub async fn submit(
        &self,
        question_id: u32,
        username: &str,
        option: AnswerOption,
        submitted_at: SystemTime,
    ) -> Result<ResponseEntity, RetryError> {
        let response = ResponseEntity {
            question_id,
            username: username.to_owned(),
            selected_option: option,
            submitted_at,
        };

        self.retry
            .run("submit_response", || {
                self.store.upsert_response(response.clone())
            })
            .await?;
        Ok(response)
    }

    /// All responses recorded for a question.
    pub async fn by_question(&self, question_id: u32) -> StorageResult<Vec<ResponseEntity>> {
        self.store.responses_for_question(question_id).await
    }

    /// The response of one participant to one question, if any.
    pub async fn find(
        &self,
        question_id: u32,
        username: &str,
    ) -> StorageResult<Option<ResponseEntity>> {
        self.store
            .find_response(question_id, username.to_owned())
            .await
    }

    /// Count votes per option; options nobody picked report zero.
    pub async fn tally(&self, question_id: u32) -> StorageResult<Tally> {
        let responses = self.by_question(question_id).await?;
        let mut tally = Tally::empty(question_id);
        for response in responses {
            if let Some(entry) = tally
                .counts
                .iter_mut()
                .find(|entry| entry.option == response.selected_option)
            {
                entry.count += 1;
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::room_store::memory::MemoryRoomStore;

    fn ledger() -> ResponseLedger {
        ResponseLedger::new(Arc::new(MemoryRoomStore::new()), RetryPolicy::no_retry())
    }

    #[tokio::test]
    async fn tally_is_zero_filled_without_votes() {
        let tally = ledger().tally(3).await.unwrap();
        let options: Vec<_> = tally.counts.iter().map(|entry| entry.option).collect();
        assert_eq!(options, AnswerOption::ALL.to_vec());
        assert!(tally.counts.iter().all(|entry| entry.count == 0));
        assert_eq!(tally.total(), 0);
    }

    #[tokio::test]
    async fn resubmission_replaces_previous_answer() {
        let ledger = ledger();
        let now = SystemTime::now();
        ledger.submit(1, "alice", AnswerOption::A, now).await.unwrap();
        ledger.submit(1, "alice", AnswerOption::B, now).await.unwrap();
        ledger.submit(1, "bob", AnswerOption::B, now).await.unwrap();

        let rows = ledger.by_question(1).await.unwrap();
        assert_eq!(rows.len(), 2);

        let alice = ledger.find(1, "alice").await.unwrap().unwrap();
        assert_eq!(alice.selected_option, AnswerOption::B);

        let tally = ledger.tally(1).await.unwrap();
        let counts: Vec<_> = tally.counts.iter().map(|entry| entry.count).collect();
        assert_eq!(counts, vec![0, 2, 0, 0]);
        assert_eq!(tally.total(), 2);
    }

    #[tokio::test]
    async fn answers_are_scoped_per_question() {
        let ledger = ledger();
        let now = SystemTime::now();
        ledger.submit(1, "alice", AnswerOption::C, now).await.unwrap();

        assert!(ledger.find(2, "alice").await.unwrap().is_none());
        assert_eq!(ledger.tally(2).await.unwrap().total(), 0);
    }
}
