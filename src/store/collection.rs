//! Owner-scoped collection accessor with optimistic mutations.
//!
//! One [`CollectionStore`] serves one named collection for whoever is
//! currently signed in: it fetches the owner's records newest-first, reflects
//! every mutation locally before the remote round-trip, and restores the
//! previous state when the remote call fails. Feature pages hold one store
//! per collection and render its entries directly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::document::{temp_id, DocumentId, OwnerId, Query, RemoteDocument};
use super::error::StoreError;
use super::remote::DocumentStore;

/// Read-filtering mode for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFilter {
    /// Every record owned by the current owner.
    #[default]
    All,
    /// Only records created during the current local calendar day.
    TodayOnly,
}

/// Per-collection read configuration.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub filter: ReadFilter,
    /// Page size for incremental loading. `None` fetches everything at once.
    pub page_size: Option<usize>,
}

impl ReadOptions {
    /// Restrict reads to the current local calendar day.
    pub fn today_only() -> Self {
        Self {
            filter: ReadFilter::TodayOnly,
            page_size: None,
        }
    }

    /// Fetch `page_size` records at a time, older pages on demand.
    pub fn paged(page_size: usize) -> Self {
        Self {
            filter: ReadFilter::All,
            page_size: Some(page_size),
        }
    }
}

/// One record in the in-memory collection.
///
/// A record is `Pending` between the optimistic insert and server
/// confirmation, and `Confirmed` once the server has assigned its id and
/// creation timestamp. A confirmed id never changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    Pending {
        /// Placeholder id, recognizable by prefix (`temp_<uuid>`)
        temp_id: String,
        /// Client-clock timestamp, replaced on confirmation
        created_at: DateTime<Utc>,
        payload: T,
    },
    Confirmed {
        id: DocumentId,
        created_at: DateTime<Utc>,
        payload: T,
    },
}

impl<T> Entry<T> {
    /// The id this entry answers to: the server id once confirmed, the
    /// placeholder before that.
    pub fn id(&self) -> String {
        match self {
            Entry::Pending { temp_id, .. } => temp_id.clone(),
            Entry::Confirmed { id, .. } => id.to_string(),
        }
    }

    /// Server id, if confirmed.
    pub fn confirmed_id(&self) -> Option<DocumentId> {
        match self {
            Entry::Pending { .. } => None,
            Entry::Confirmed { id, .. } => Some(*id),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Entry::Pending { created_at, .. } | Entry::Confirmed { created_at, .. } => *created_at,
        }
    }

    pub fn payload(&self) -> &T {
        match self {
            Entry::Pending { payload, .. } | Entry::Confirmed { payload, .. } => payload,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::Pending { .. })
    }

    fn matches(&self, id: &str) -> bool {
        match self {
            Entry::Pending { temp_id, .. } => temp_id == id,
            Entry::Confirmed { id: doc_id, .. } => doc_id.to_string() == id,
        }
    }
}

struct State<T> {
    owner: Option<OwnerId>,
    entries: Vec<Entry<T>>,
    loading: bool,
    loading_more: bool,
    has_more: bool,
    last_error: Option<StoreError>,
}

/// Accessor over one named remote collection, scoped to the current owner.
pub struct CollectionStore<T, S> {
    remote: Arc<S>,
    owner_rx: watch::Receiver<Option<OwnerId>>,
    collection: String,
    options: ReadOptions,
    state: Mutex<State<T>>,
}

impl<T, S> CollectionStore<T, S>
where
    T: Serialize + DeserializeOwned + Clone,
    S: DocumentStore,
{
    /// Creates an accessor for `collection`, observing the owner identity
    /// through `owner_rx` (see [`crate::auth::AuthSession::subscribe`]).
    pub fn new(
        remote: Arc<S>,
        owner_rx: watch::Receiver<Option<OwnerId>>,
        collection: impl Into<String>,
        options: ReadOptions,
    ) -> Self {
        let owner = owner_rx.borrow().clone();
        Self {
            remote,
            owner_rx,
            collection: collection.into(),
            options,
            state: Mutex::new(State {
                owner,
                entries: Vec::new(),
                loading: false,
                loading_more: false,
                has_more: false,
                last_error: None,
            }),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Snapshot of the in-memory collection, newest first.
    pub fn entries(&self) -> Vec<Entry<T>> {
        let mut state = self.lock();
        self.sync_owner(&mut state);
        state.entries.clone()
    }

    /// True while a `refresh` is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// True while a `load_more` is in flight.
    pub fn is_loading_more(&self) -> bool {
        self.lock().loading_more
    }

    /// True if an older page may exist (paged stores only).
    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    /// The most recent operation failure, until the next refresh.
    pub fn last_error(&self) -> Option<StoreError> {
        self.lock().last_error.clone()
    }

    /// Replaces the collection with a fresh fetch of the owner's records.
    ///
    /// With no owner signed in the collection is empty and no remote call is
    /// made. On failure the previous records stay visible and the error is
    /// recorded.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let owner = {
            let mut state = self.lock();
            self.sync_owner(&mut state);
            let Some(owner) = state.owner.clone() else {
                state.entries.clear();
                state.loading = false;
                return Ok(());
            };
            state.loading = true;
            state.last_error = None;
            owner
        };

        tracing::debug!(collection = %self.collection, owner = %owner, "fetching collection");
        let result = self
            .remote
            .query(&self.collection, self.read_query(&owner))
            .await;

        let mut state = self.lock();
        state.loading = false;
        if state.owner.as_ref() != Some(&owner) {
            // response for a previous owner; drop it
            return Ok(());
        }
        match result {
            Ok(docs) => {
                let page_full = self
                    .options
                    .page_size
                    .map(|n| docs.len() >= n)
                    .unwrap_or(false);
                match decode_documents(docs) {
                    Ok(mut entries) => {
                        sort_newest_first(&mut entries);
                        state.entries = entries;
                        state.has_more = page_full;
                        Ok(())
                    }
                    Err(err) => {
                        state.last_error = Some(err.clone());
                        Err(err)
                    }
                }
            }
            Err(err) => {
                tracing::warn!(collection = %self.collection, "fetch failed: {err}");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Fetches the next page of strictly older records and appends it.
    ///
    /// No-op unless the store is paged, a page boundary was reached, and no
    /// other `load_more` is in flight.
    pub async fn load_more(&self) -> Result<(), StoreError> {
        let Some(page) = self.options.page_size else {
            return Ok(());
        };

        let (owner, cursor) = {
            let mut state = self.lock();
            self.sync_owner(&mut state);
            let Some(owner) = state.owner.clone() else {
                return Ok(());
            };
            if !state.has_more || state.loading_more {
                return Ok(());
            }
            // the oldest confirmed entry anchors the next page; pending
            // entries never participate in paging
            let Some(cursor) = state.entries.iter().rev().find_map(|e| match e {
                Entry::Confirmed { created_at, .. } => Some(*created_at),
                Entry::Pending { .. } => None,
            }) else {
                return Ok(());
            };
            state.loading_more = true;
            (owner, cursor)
        };

        let query = self.read_query(&owner).created_before(cursor);
        let result = self.remote.query(&self.collection, query).await;

        let mut state = self.lock();
        state.loading_more = false;
        if state.owner.as_ref() != Some(&owner) {
            return Ok(());
        }
        match result {
            Ok(docs) => {
                state.has_more = docs.len() >= page;
                match decode_documents(docs) {
                    Ok(mut entries) => {
                        state.entries.append(&mut entries);
                        sort_newest_first(&mut state.entries);
                        Ok(())
                    }
                    Err(err) => {
                        state.last_error = Some(err.clone());
                        Err(err)
                    }
                }
            }
            Err(err) => {
                tracing::warn!(collection = %self.collection, "load_more failed: {err}");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Creates a record from `payload`.
    ///
    /// The record appears in the collection immediately under a placeholder
    /// id, then swaps to the server-assigned id and timestamp on
    /// confirmation. On failure the placeholder is removed and the error
    /// returned.
    pub async fn create(&self, payload: T) -> Result<DocumentId, StoreError> {
        let fields = encode_payload(&payload)?;

        let (owner, placeholder) = {
            let mut state = self.lock();
            self.sync_owner(&mut state);
            let Some(owner) = state.owner.clone() else {
                return Err(StoreError::NotAuthenticated);
            };
            let placeholder = temp_id();
            state.entries.push(Entry::Pending {
                temp_id: placeholder.clone(),
                created_at: Utc::now(),
                payload: payload.clone(),
            });
            sort_newest_first(&mut state.entries);
            (owner, placeholder)
        };

        match self.remote.insert(&self.collection, &owner, fields).await {
            Ok(receipt) => {
                let mut state = self.lock();
                if state.owner.as_ref() == Some(&owner) {
                    if let Some(entry) =
                        state.entries.iter_mut().find(|e| e.matches(&placeholder))
                    {
                        let payload = entry.payload().clone();
                        *entry = Entry::Confirmed {
                            id: receipt.id,
                            created_at: receipt.created_at,
                            payload,
                        };
                    }
                    sort_newest_first(&mut state.entries);
                }
                Ok(receipt.id)
            }
            Err(err) => {
                tracing::warn!(collection = %self.collection, "create rolled back: {err}");
                let mut state = self.lock();
                if state.owner.as_ref() == Some(&owner) {
                    state.entries.retain(|e| !e.matches(&placeholder));
                }
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Applies a partial update to the record with `id`.
    ///
    /// `patch` must be a JSON object; its keys overwrite the matching payload
    /// fields. Owner and creation timestamp are immutable. On failure the
    /// collection is restored to its pre-update state.
    pub async fn update(&self, id: &str, patch: Value) -> Result<(), StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::Payload(
                "update patch must be a JSON object".to_string(),
            ));
        };

        let (owner, snapshot) = {
            let mut state = self.lock();
            self.sync_owner(&mut state);
            let Some(owner) = state.owner.clone() else {
                return Err(StoreError::NotAuthenticated);
            };
            let snapshot = state.entries.clone();
            if let Some(entry) = state.entries.iter_mut().find(|e| e.matches(id)) {
                let patched = patched_payload(entry.payload(), &patch)?;
                match entry {
                    Entry::Pending { payload, .. } | Entry::Confirmed { payload, .. } => {
                        *payload = patched
                    }
                }
            }
            (owner, snapshot)
        };

        match self.remote.update(&self.collection, id, patch).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(collection = %self.collection, id, "update rolled back: {err}");
                let mut state = self.lock();
                if state.owner.as_ref() == Some(&owner) {
                    state.entries = snapshot;
                }
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Deletes the record with `id`.
    ///
    /// The record disappears from the collection immediately; on failure it
    /// is restored.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let (owner, snapshot) = {
            let mut state = self.lock();
            self.sync_owner(&mut state);
            let Some(owner) = state.owner.clone() else {
                return Err(StoreError::NotAuthenticated);
            };
            let snapshot = state.entries.clone();
            state.entries.retain(|e| !e.matches(id));
            (owner, snapshot)
        };

        match self.remote.delete(&self.collection, id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(collection = %self.collection, id, "delete rolled back: {err}");
                let mut state = self.lock();
                if state.owner.as_ref() == Some(&owner) {
                    state.entries = snapshot;
                }
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn read_query(&self, owner: &OwnerId) -> Query {
        let mut query = Query::for_owner(owner.clone());
        if self.options.filter == ReadFilter::TodayOnly {
            let (start, end) = local_day_bounds(Local::now());
            query = query.created_within(start, end);
        }
        if let Some(page) = self.options.page_size {
            query = query.with_limit(page);
        }
        query
    }

    /// Reconciles with the auth subscription. Records from a previous owner
    /// must never remain visible, so a change clears the collection.
    fn sync_owner(&self, state: &mut State<T>) {
        let current = self.owner_rx.borrow().clone();
        if state.owner != current {
            tracing::debug!(collection = %self.collection, "owner changed, clearing collection");
            state.owner = current;
            state.entries.clear();
            state.has_more = false;
            state.last_error = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sort_newest_first<T>(entries: &mut [Entry<T>]) {
    entries.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}

fn decode_documents<T: DeserializeOwned>(
    docs: Vec<RemoteDocument>,
) -> Result<Vec<Entry<T>>, StoreError> {
    docs.into_iter()
        .map(|doc| {
            let payload = serde_json::from_value(Value::Object(doc.fields))
                .map_err(|e| StoreError::Payload(e.to_string()))?;
            Ok(Entry::Confirmed {
                id: doc.id,
                created_at: doc.created_at,
                payload,
            })
        })
        .collect()
}

fn encode_payload<T: Serialize>(payload: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(payload).map_err(|e| StoreError::Payload(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Payload(
            "payload must serialize to a JSON object".to_string(),
        )),
    }
}

fn patched_payload<T>(payload: &T, patch: &Map<String, Value>) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(payload).map_err(|e| StoreError::Payload(e.to_string()))?;
    let Value::Object(map) = &mut value else {
        return Err(StoreError::Payload(
            "payload must serialize to a JSON object".to_string(),
        ));
    };
    for (key, patched) in patch {
        map.insert(key.clone(), patched.clone());
    }
    serde_json::from_value(value).map_err(|e| StoreError::Payload(e.to_string()))
}

/// Half-open UTC bounds of the local calendar day containing `now`.
fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_naive = now.date_naive().and_time(NaiveTime::MIN);
    let end_naive = start_naive + Duration::days(1);
    // local midnight can be ambiguous or absent around DST transitions
    let to_utc = |naive: chrono::NaiveDateTime| match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    };
    (to_utc(start_naive), to_utc(end_naive))
}
