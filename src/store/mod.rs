//! Owner-scoped collection data access.
//!
//! The remote document store hands out per-user documents; [`CollectionStore`]
//! wraps one collection of them with optimistic create/update/delete and
//! rollback on failure.

mod collection;
mod document;
mod error;
mod memory;
mod remote;

pub use collection::{CollectionStore, Entry, ReadFilter, ReadOptions};
pub use document::{
    is_temp_id, temp_id, DocumentId, DocumentIdError, Filter, InsertReceipt, OwnerId, Query,
    RemoteDocument, SortOrder, TEMP_ID_PREFIX,
};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use remote::{DocumentStore, HttpDocumentStore};
