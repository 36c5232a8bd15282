//! Remote document store contract and HTTP client.
//!
//! [`DocumentStore`] is the seam every accessor talks through. The hosted
//! document API assigns ids and creation timestamps server-side; the client
//! clock is never authoritative for confirmed documents.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::document::{InsertReceipt, OwnerId, Query, RemoteDocument};
use super::error::StoreError;

/// Contract of the remote per-user document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Runs a filtered, ordered query against one collection.
    async fn query(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<Vec<RemoteDocument>, StoreError>;

    /// Inserts a document. The server assigns its id and creation timestamp.
    async fn insert(
        &self,
        collection: &str,
        owner: &OwnerId,
        fields: Map<String, Value>,
    ) -> Result<InsertReceipt, StoreError>;

    /// Applies a partial update to the payload fields of an existing
    /// document. Owner and creation timestamp are immutable.
    ///
    /// Fails with [`StoreError::NotFound`] if `id` is absent.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Removes a document.
    ///
    /// Fails with [`StoreError::NotFound`] if `id` is absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// HTTP client for the hosted document API.
///
/// Authenticates with a bearer API key. Endpoints:
/// - `POST   /collections/<name>/query`
/// - `POST   /collections/<name>`
/// - `PATCH  /collections/<name>/<id>`
/// - `DELETE /collections/<name>/<id>`
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    server_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct InsertBody<'a> {
    owner_id: &'a OwnerId,
    fields: &'a Map<String, Value>,
}

impl HttpDocumentStore {
    /// Creates a new store client with explicit parameters.
    pub fn new(server_url: String, api_key: String) -> Self {
        Self {
            server_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Builds an HTTP URL for a given path.
    fn build_url(&self, path: &str) -> String {
        let base_url = if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("https://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    fn check_status(
        response: &reqwest::Response,
        id: Option<&str>,
    ) -> Result<(), StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        Err(StoreError::Remote(format!(
            "Server returned status {}",
            status
        )))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn query(
        &self,
        collection: &str,
        query: Query,
    ) -> Result<Vec<RemoteDocument>, StoreError> {
        let url = self.build_url(&format!("/collections/{}/query", collection));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&query)
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        Self::check_status(&response, None)?;

        response
            .json()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))
    }

    async fn insert(
        &self,
        collection: &str,
        owner: &OwnerId,
        fields: Map<String, Value>,
    ) -> Result<InsertReceipt, StoreError> {
        let url = self.build_url(&format!("/collections/{}", collection));
        let body = InsertBody {
            owner_id: owner,
            fields: &fields,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        Self::check_status(&response, None)?;

        response
            .json()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let url = self.build_url(&format!("/collections/{}/{}", collection, id));

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&patch)
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        Self::check_status(&response, Some(id))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.build_url(&format!("/collections/{}/{}", collection, id));

        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        Self::check_status(&response, Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let store = HttpDocumentStore::new(
            "http://localhost:8080".to_string(),
            "test-key".to_string(),
        );
        assert_eq!(
            store.build_url("/collections/moodEntries"),
            "http://localhost:8080/collections/moodEntries"
        );

        let store = HttpDocumentStore::new(
            "https://api.example.com/".to_string(),
            "test-key".to_string(),
        );
        assert_eq!(
            store.build_url("/collections/moodEntries"),
            "https://api.example.com/collections/moodEntries"
        );

        let store =
            HttpDocumentStore::new("api.example.com".to_string(), "test-key".to_string());
        assert_eq!(
            store.build_url("/collections/moodEntries"),
            "https://api.example.com/collections/moodEntries"
        );
    }

    #[test]
    fn test_store_accessors() {
        let store =
            HttpDocumentStore::new("https://api.example.com".to_string(), "my-key".to_string());
        assert_eq!(store.server_url(), "https://api.example.com");
    }
}
