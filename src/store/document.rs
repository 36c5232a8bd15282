//! Document identifiers, remote document shapes, and queries.
//!
//! Confirmed documents carry a server-assigned [`DocumentId`] and creation
//! timestamp. Between an optimistic insert and server confirmation a record
//! answers to a locally synthesized placeholder id instead (`temp_<uuid>`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix marking a locally synthesized placeholder id.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Errors that can occur when parsing a document id.
#[derive(Error, Debug)]
pub enum DocumentIdError {
    #[error("Invalid document id '{0}': not a UUID")]
    InvalidUuid(String),
}

/// Server-assigned identifier of a confirmed document.
///
/// Internally a UUID; displays and serializes as the hyphenated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a new random document id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated string form
    pub fn parse(s: &str) -> Result<Self, DocumentIdError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DocumentIdError::InvalidUuid(s.to_string()))
    }

    /// Get as UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DocumentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<DocumentId> for Uuid {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Synthesize a placeholder id for the optimistic insert phase.
pub fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

/// Returns true if `id` is a locally synthesized placeholder.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Identifier of the authenticated owner a record is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A document as held by the remote store.
///
/// `owner_id` and `created_at` are managed by the store and immutable after
/// creation; feature payloads travel in `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: DocumentId,
    pub owner_id: OwnerId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Server-assigned id and creation timestamp returned from an insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertReceipt {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
}

/// Constraints supported by the remote store: equality on the owner and
/// half-open ranges on the creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Filter {
    OwnerEq(OwnerId),
    CreatedAtOrAfter(DateTime<Utc>),
    CreatedBefore(DateTime<Utc>),
}

/// Result ordering by creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    CreatedAtDesc,
    CreatedAtAsc,
}

/// A one-shot query against a named collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Query {
    /// Query scoped to one owner, newest first.
    pub fn for_owner(owner: OwnerId) -> Self {
        Self {
            filters: vec![Filter::OwnerEq(owner)],
            order: SortOrder::CreatedAtDesc,
            limit: None,
        }
    }

    /// Constrain creation time to the half-open interval `[start, end)`.
    pub fn created_within(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filters.push(Filter::CreatedAtOrAfter(start));
        self.filters.push(Filter::CreatedBefore(end));
        self
    }

    /// Constrain creation time to strictly before `cursor`.
    pub fn created_before(mut self, cursor: DateTime<Utc>) -> Self {
        self.filters.push(Filter::CreatedBefore(cursor));
        self
    }

    /// Cap the number of returned documents.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
