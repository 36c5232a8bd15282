//! In-memory document store.
//!
//! Backs tests and unconfigured local runs. Documents live in per-collection
//! vectors; queries evaluate the same filter and ordering contract the hosted
//! API provides. A queued one-shot failure lets callers exercise rollback
//! paths.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};

use super::document::{
    DocumentId, Filter, InsertReceipt, OwnerId, Query, RemoteDocument, SortOrder,
};
use super::error::StoreError;
use super::remote::DocumentStore;
use async_trait::async_trait;

/// In-process [`DocumentStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, Vec<RemoteDocument>>,
    fail_next: Option<StoreError>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an error returned by the next store call instead of running it.
    pub fn fail_next(&self, err: StoreError) {
        self.lock().fail_next = Some(err);
    }

    /// Plants a confirmed document directly, bypassing the insert path.
    pub fn seed(&self, collection: &str, doc: RemoteDocument) {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    /// Number of documents currently held in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> Option<StoreError> {
        self.lock().fail_next.take()
    }
}

fn matches(doc: &RemoteDocument, filter: &Filter) -> bool {
    match filter {
        Filter::OwnerEq(owner) => doc.owner_id == *owner,
        Filter::CreatedAtOrAfter(at) => doc.created_at >= *at,
        Filter::CreatedBefore(at) => doc.created_at < *at,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<Vec<RemoteDocument>, StoreError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let inner = self.lock();
        let mut docs: Vec<RemoteDocument> = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.filters.iter().all(|f| matches(doc, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        match query.order {
            SortOrder::CreatedAtDesc => docs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::CreatedAtAsc => docs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }

    async fn insert(
        &self,
        collection: &str,
        owner: &OwnerId,
        fields: Map<String, Value>,
    ) -> Result<InsertReceipt, StoreError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let receipt = InsertReceipt {
            id: DocumentId::new(),
            created_at: Utc::now(),
        };

        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(RemoteDocument {
                id: receipt.id,
                owner_id: owner.clone(),
                created_at: receipt.created_at,
                fields,
            });

        Ok(receipt)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut inner = self.lock();
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id.to_string() == id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        for (key, value) in patch {
            doc.fields.insert(key, value);
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut inner = self.lock();
        let docs = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let before = docs.len();
        docs.retain(|doc| doc.id.to_string() != id);
        if docs.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
