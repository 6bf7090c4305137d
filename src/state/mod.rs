pub mod clock;
pub mod presenter;
pub mod room;
pub mod state_machine;

use std::{future::Future, sync::Arc, time::SystemTime};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{ledger::ResponseLedger, room_store::RoomStore},
    error::ServiceError,
};

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::presenter::PresenterToken;
pub use self::room::{RoomPhase, RoomSnapshot};
pub use self::state_machine::{
    Direction, InvalidTransition, Plan, RoomEvent, RoomStateMachine, StateConflict,
};

pub type SharedState = Arc<AppState>;

/// Central application state: the storage handle, the room rules and the
/// transition gate.
pub struct AppState {
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    machine: RoomStateMachine,
    degraded: watch::Sender<bool>,
    transition_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an explicit time source.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            room_store: RwLock::new(None),
            machine: RoomStateMachine::new(config.default_duration_seconds),
            config,
            clock,
            degraded: degraded_tx,
            transition_gate: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current room store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_room_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        self.room_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn install_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current room store and enter degraded mode.
    pub async fn clear_room_store(&self) {
        {
            let mut guard = self.room_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.room_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Response ledger bound to the installed store.
    pub async fn ledger(&self) -> Result<ResponseLedger, ServiceError> {
        let store = self.require_room_store().await?;
        Ok(ResponseLedger::new(store, self.config.retry))
    }

    /// Read the room record and pair it with the current time.
    pub async fn load_room(&self) -> Result<RoomSnapshot, ServiceError> {
        let store = self.require_room_store().await?;
        self.load_room_from(&store).await
    }

    async fn load_room_from(
        &self,
        store: &Arc<dyn RoomStore>,
    ) -> Result<RoomSnapshot, ServiceError> {
        let default_duration = self.config.default_duration_seconds;
        let state = self
            .config
            .retry
            .run("load_room_state", || store.load_room_state(default_duration))
            .await?;
        Ok(RoomSnapshot::new(state, self.now()))
    }

    /// Run a presenter transition.
    ///
    /// Transitions are serialized by a single gate. The room record is read,
    /// `event` is planned against it, and `work` runs under the transition
    /// timeout with the store and the plan. Only when `work` succeeds is the
    /// plan's patch written; otherwise the room record is left untouched.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: RoomEvent,
        work: F,
    ) -> Result<(T, RoomSnapshot), ServiceError>
    where
        F: FnOnce(Arc<dyn RoomStore>, Plan) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let store = self.require_room_store().await?;
        let current = self.load_room_from(&store).await?;
        let plan = self
            .machine
            .plan(&current.state, event, current.observed_at)?;
        let patch = plan.patch.clone();
        let (from, to, event) = (plan.from.clone(), plan.to.clone(), plan.event.clone());

        let work_future = work(store.clone(), plan);
        let outcome = match self.config.transition_timeout {
            Some(limit) => match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(event = ?event, "transition work timed out; room left unchanged");
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            },
            None => work_future.await,
        };

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(event = ?event, error = %err, "transition work failed; room left unchanged");
                drop(gate);
                return Err(err);
            }
        };

        let next = self
            .config
            .retry
            .run("update_room_state", || store.update_room_state(patch.clone()))
            .await?;
        drop(gate);

        info!(event = ?event, from = ?from, to = ?to, "room transition applied");
        Ok((value, RoomSnapshot::new(next, current.observed_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::room_store::memory::MemoryRoomStore;
    use std::time::Duration;

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        state
    }

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let watcher = state.degraded_watcher();
        assert!(state.is_degraded().await);
        assert!(matches!(state.load_room().await, Err(ServiceError::Degraded)));

        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(!*watcher.borrow());

        state.clear_room_store().await;
        assert!(*watcher.borrow());
    }

    #[tokio::test]
    async fn failed_work_leaves_room_untouched() {
        let state = ready_state().await;

        let result: Result<((), _), _> = state
            .run_transition(RoomEvent::Open { duration_seconds: 30 }, |_, _| async {
                Err(ServiceError::NotFound("nope".into()))
            })
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        let snapshot = state.load_room().await.unwrap();
        assert!(!snapshot.state.is_active);
    }

    #[tokio::test]
    async fn timed_out_work_leaves_room_untouched() {
        let mut config = AppConfig::default();
        config.transition_timeout = Some(Duration::from_millis(20));
        let state = AppState::new(config);
        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;

        let result = state
            .run_transition(RoomEvent::Open { duration_seconds: 30 }, |_, _| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert!(!state.load_room().await.unwrap().state.is_active);
    }

    #[tokio::test]
    async fn successful_transition_persists_the_patch() {
        let state = ready_state().await;

        let (value, snapshot) = state
            .run_transition(RoomEvent::Open { duration_seconds: 30 }, |_, plan| async move {
                Ok(plan.to)
            })
            .await
            .unwrap();
        assert!(matches!(value, RoomPhase::Open { question_id: 1, .. }));
        assert!(snapshot.state.is_active);
        assert_eq!(snapshot.state.duration_seconds, 30);
        assert_eq!(state.load_room().await.unwrap().state, snapshot.state);
    }

    #[tokio::test]
    async fn invalid_event_is_a_conflict() {
        let state = ready_state().await;
        let result = state
            .run_transition(RoomEvent::Advance(Direction::Forward), |_, _| async { Ok(()) })
            .await;
        assert!(result.is_ok());

        let result = state
            .run_transition(
                RoomEvent::Close {
                    question_id: 2,
                    answer: crate::dao::models::AnswerOption::A,
                },
                |_, _| async { Ok(()) },
            )
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Conflict(StateConflict::NotActive))
        ));
    }
}
