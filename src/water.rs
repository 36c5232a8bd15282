//! Daily water intake tracking.
//!
//! Water is logged as one document per owner per local calendar day. Tapping
//! the counter can happen many times in a row, so writes are debounced: the
//! local count updates immediately and only the trailing value is saved after
//! a short quiet period. A failed save keeps the local count; the next save
//! simply retries with the current value.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::store::{DocumentId, DocumentStore, OwnerId, Query, StoreError};

/// Water intake for one owner-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterIntake {
    pub glasses: u32,
    pub goal: u32,
    /// Local calendar day, `YYYY-MM-DD`
    pub date: String,
}

impl WaterIntake {
    /// Collection this payload lives in.
    pub const COLLECTION: &'static str = "waterIntake";
}

/// Trailing-edge delay before a glass-count change is written out.
const SAVE_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Default daily goal when none is configured.
pub const DEFAULT_GOAL: u32 = 8;

#[derive(Debug)]
struct WaterState {
    owner: Option<OwnerId>,
    date: String,
    glasses: u32,
    goal: u32,
    /// Today's remote document, once known to exist
    doc_id: Option<DocumentId>,
    dirty: bool,
    loading: bool,
    last_error: Option<StoreError>,
}

/// Tracks today's water intake for the current owner.
pub struct WaterTracker<S> {
    remote: Arc<S>,
    owner_rx: watch::Receiver<Option<OwnerId>>,
    default_goal: u32,
    state: Arc<Mutex<WaterState>>,
    pending_save: Mutex<Option<JoinHandle<()>>>,
}

impl<S> WaterTracker<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(
        remote: Arc<S>,
        owner_rx: watch::Receiver<Option<OwnerId>>,
        default_goal: u32,
    ) -> Self {
        let owner = owner_rx.borrow().clone();
        Self {
            remote,
            owner_rx,
            default_goal,
            state: Arc::new(Mutex::new(WaterState {
                owner,
                date: today_string(),
                glasses: 0,
                goal: default_goal,
                doc_id: None,
                dirty: false,
                loading: false,
                last_error: None,
            })),
            pending_save: Mutex::new(None),
        }
    }

    pub fn glasses(&self) -> u32 {
        let mut state = self.lock();
        self.sync_context(&mut state);
        state.glasses
    }

    pub fn goal(&self) -> u32 {
        self.lock().goal
    }

    /// Today's intake as a payload snapshot.
    pub fn intake(&self) -> WaterIntake {
        let mut state = self.lock();
        self.sync_context(&mut state);
        WaterIntake {
            glasses: state.glasses,
            goal: state.goal,
            date: state.date.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn last_error(&self) -> Option<StoreError> {
        self.lock().last_error.clone()
    }

    /// Loads today's document for the current owner, defaulting to zero
    /// glasses when none exists yet.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let owner = {
            let mut state = self.lock();
            self.sync_context(&mut state);
            let Some(owner) = state.owner.clone() else {
                state.loading = false;
                return Ok(());
            };
            state.loading = true;
            state.last_error = None;
            owner
        };

        let result = self
            .remote
            .query(WaterIntake::COLLECTION, Query::for_owner(owner.clone()))
            .await;

        let mut state = self.lock();
        state.loading = false;
        if state.owner.as_ref() != Some(&owner) {
            return Ok(());
        }
        match result {
            Ok(docs) => {
                // the store only filters on owner; match the day locally
                let today = &state.date;
                let found = docs.into_iter().find_map(|doc| {
                    let intake: WaterIntake =
                        serde_json::from_value(Value::Object(doc.fields)).ok()?;
                    (intake.date == *today).then_some((doc.id, intake))
                });
                match found {
                    Some((id, intake)) => {
                        state.doc_id = Some(id);
                        state.glasses = intake.glasses;
                        state.goal = intake.goal;
                    }
                    None => {
                        state.doc_id = None;
                        state.glasses = 0;
                        state.goal = self.default_goal;
                    }
                }
                state.dirty = false;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("water intake fetch failed: {err}");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Sets today's glass count and schedules a debounced save.
    pub fn set_glasses(&self, glasses: u32) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            self.sync_context(&mut state);
            if state.owner.is_none() {
                return Err(StoreError::NotAuthenticated);
            }
            state.glasses = glasses;
            state.dirty = true;
        }
        self.schedule_save();
        Ok(())
    }

    /// Convenience for the one-more-glass tap.
    pub fn add_glass(&self) -> Result<(), StoreError> {
        let current = self.glasses();
        self.set_glasses(current + 1)
    }

    /// Cancels any pending timer and writes the current value out now.
    pub async fn flush(&self) {
        let pending = self.lock_pending().take();
        if let Some(handle) = pending {
            handle.abort();
        }
        save(self.remote.clone(), self.state.clone()).await;
    }

    fn schedule_save(&self) {
        let remote = self.remote.clone();
        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(SAVE_DEBOUNCE).await;
            save(remote, state).await;
        });
        // only the trailing value is written
        if let Some(previous) = self.lock_pending().replace(handle) {
            previous.abort();
        }
    }

    /// Reconciles with the auth subscription and the calendar: an owner
    /// switch or day rollover starts a fresh zero-glass day.
    fn sync_context(&self, state: &mut WaterState) {
        let current = self.owner_rx.borrow().clone();
        let today = today_string();
        if state.owner != current || state.date != today {
            state.owner = current;
            state.date = today;
            state.glasses = 0;
            state.goal = self.default_goal;
            state.doc_id = None;
            state.dirty = false;
            state.last_error = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, WaterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> WaterTracker<S> {
    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_save
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Drop for WaterTracker<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
    }
}

async fn save<S: DocumentStore>(remote: Arc<S>, state: Arc<Mutex<WaterState>>) {
    let (owner, doc_id, intake) = {
        let state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.dirty {
            return;
        }
        let Some(owner) = state.owner.clone() else {
            return;
        };
        (
            owner,
            state.doc_id,
            WaterIntake {
                glasses: state.glasses,
                goal: state.goal,
                date: state.date.clone(),
            },
        )
    };

    let result = match doc_id {
        Some(id) => {
            let mut patch = Map::new();
            patch.insert("glasses".to_string(), Value::from(intake.glasses));
            remote
                .update(WaterIntake::COLLECTION, &id.to_string(), patch)
                .await
                .map(|_| None)
        }
        None => match serde_json::to_value(&intake) {
            Ok(Value::Object(fields)) => remote
                .insert(WaterIntake::COLLECTION, &owner, fields)
                .await
                .map(|receipt| Some(receipt.id)),
            Ok(_) | Err(_) => Err(StoreError::Payload(
                "water intake must serialize to a JSON object".to_string(),
            )),
        },
    };

    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    match result {
        Ok(new_id) => {
            if let Some(id) = new_id {
                state.doc_id = Some(id);
            }
            // a newer value may have arrived while the write was in flight;
            // its own save is already scheduled
            if state.glasses == intake.glasses {
                state.dirty = false;
            }
        }
        Err(err) => {
            tracing::warn!("water intake save failed: {err}");
            state.last_error = Some(err);
        }
    }
}

fn today_string() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSession;
    use crate::store::{InsertReceipt, MemoryStore, RemoteDocument};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts writes so debounce coalescing is observable.
    struct CountingStore {
        inner: MemoryStore,
        inserts: AtomicUsize,
        updates: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                inserts: AtomicUsize::new(0),
                updates: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn query(
            &self,
            collection: &str,
            query: Query,
        ) -> Result<Vec<RemoteDocument>, StoreError> {
            self.inner.query(collection, query).await
        }

        async fn insert(
            &self,
            collection: &str,
            owner: &OwnerId,
            fields: Map<String, Value>,
        ) -> Result<InsertReceipt, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(collection, owner, fields).await
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            patch: Map<String, Value>,
        ) -> Result<(), StoreError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update(collection, id, patch).await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
            self.inner.delete(collection, id).await
        }
    }

    fn tracker(remote: Arc<CountingStore>) -> (AuthSession, WaterTracker<CountingStore>) {
        let auth = AuthSession::signed_in(OwnerId::new("user-1"));
        let tracker = WaterTracker::new(remote, auth.subscribe(), DEFAULT_GOAL);
        (auth, tracker)
    }

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn seed_today(remote: &MemoryStore, owner: &str, glasses: u32) {
        let intake = WaterIntake {
            glasses,
            goal: DEFAULT_GOAL,
            date: today_string(),
        };
        let fields = match serde_json::to_value(&intake).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        remote.seed(
            WaterIntake::COLLECTION,
            RemoteDocument {
                id: DocumentId::new(),
                owner_id: OwnerId::new(owner),
                created_at: chrono::Utc::now(),
                fields,
            },
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_glasses_is_immediate_but_unsaved() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote.clone());

        tracker.set_glasses(3).unwrap();

        assert_eq!(tracker.glasses(), 3);
        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_updates_coalesce_into_one_write() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote.clone());

        tracker.set_glasses(1).unwrap();
        tracker.set_glasses(2).unwrap();
        tracker.set_glasses(3).unwrap();

        settle(Duration::from_secs(2)).await;

        assert_eq!(remote.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(remote.updates.load(Ordering::SeqCst), 0);
        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_save_updates_existing_document() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote.clone());

        tracker.set_glasses(2).unwrap();
        settle(Duration::from_secs(2)).await;

        tracker.set_glasses(5).unwrap();
        settle(Duration::from_secs(2)).await;

        assert_eq!(remote.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(remote.updates.load(Ordering::SeqCst), 1);
        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 1);

        let docs = remote
            .inner
            .query(
                WaterIntake::COLLECTION,
                Query::for_owner(OwnerId::new("user-1")),
            )
            .await
            .unwrap();
        assert_eq!(docs[0].fields["glasses"], 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loads_existing_day() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote.clone());
        seed_today(&remote.inner, "user-1", 4);

        tracker.refresh().await.unwrap();

        assert_eq!(tracker.glasses(), 4);

        // further saves update the existing document instead of creating one
        tracker.set_glasses(6).unwrap();
        settle(Duration::from_secs(2)).await;
        assert_eq!(remote.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(remote.updates.load(Ordering::SeqCst), 1);
        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_keeps_local_count() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote.clone());

        tracker.set_glasses(3).unwrap();
        remote.inner.fail_next(StoreError::Remote("offline".to_string()));
        settle(Duration::from_secs(2)).await;

        assert_eq!(tracker.glasses(), 3);
        assert!(tracker.last_error().is_some());
        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 0);

        // the next change saves normally
        tracker.set_glasses(4).unwrap();
        settle(Duration::from_secs(2)).await;
        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_without_waiting() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote.clone());

        tracker.set_glasses(2).unwrap();
        tracker.flush().await;

        assert_eq!(remote.inner.count(WaterIntake::COLLECTION), 1);
        assert_eq!(remote.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_glasses_without_owner_is_rejected() {
        let remote = Arc::new(CountingStore::new());
        let auth = AuthSession::new();
        let tracker = WaterTracker::new(remote, auth.subscribe(), DEFAULT_GOAL);

        let result = tracker.set_glasses(2);

        assert!(matches!(result, Err(StoreError::NotAuthenticated)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_switch_resets_count() {
        let remote = Arc::new(CountingStore::new());
        let (auth, tracker) = tracker(remote.clone());
        seed_today(&remote.inner, "user-1", 4);
        tracker.refresh().await.unwrap();
        assert_eq!(tracker.glasses(), 4);

        auth.sign_in(OwnerId::new("user-2"));

        assert_eq!(tracker.glasses(), 0);
        assert_eq!(tracker.goal(), DEFAULT_GOAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_glass_increments() {
        let remote = Arc::new(CountingStore::new());
        let (_auth, tracker) = tracker(remote);

        tracker.add_glass().unwrap();
        tracker.add_glass().unwrap();

        assert_eq!(tracker.glasses(), 2);
    }
}
