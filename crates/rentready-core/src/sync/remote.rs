//! Remote document store
//!
//! The remote side is addressed by collection (`items`, `rentals`) and
//! document id and supports three idempotent operations: upsert, field merge
//! and delete.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::SyncTable;

/// Failure to apply one change remotely
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network or protocol failure talking to the remote store
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote store answered with a non-success status
    #[error("Remote store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// A merge targeted a document the remote store does not have
    #[error("No {collection} document with id '{id}' on the remote store")]
    NotFound { collection: SyncTable, id: String },

    /// The queued payload cannot be applied
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The remote store cannot be reached right now
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid remote URL '{0}'")]
    InvalidUrl(String),
}

/// Operations the sync processor needs from the remote store.
///
/// Every operation must be idempotent: the queue delivers at least once.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create or fully overwrite a document
    async fn upsert(&self, collection: SyncTable, id: &str, document: &Value)
        -> Result<(), RemoteError>;

    /// Merge `fields` into an existing document
    async fn merge(&self, collection: SyncTable, id: &str, fields: &Value)
        -> Result<(), RemoteError>;

    /// Remove a document; removing a missing document succeeds
    async fn delete(&self, collection: SyncTable, id: &str) -> Result<(), RemoteError>;
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, RemoteError> {
    value
        .as_object()
        .ok_or_else(|| RemoteError::MalformedPayload(format!("expected a JSON object, got {}", value)))
}

// ==================== In-process store ====================

/// In-process document store, used for tests and offline demos
pub struct MemoryRemote {
    documents: Mutex<HashMap<(SyncTable, String), Map<String, Value>>>,
    online: AtomicBool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with `Unavailable`
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Current copy of a document
    pub fn get(&self, collection: SyncTable, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .ok()?
            .get(&(collection, id.to_string()))
            .cloned()
            .map(Value::Object)
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: SyncTable) -> usize {
        self.documents
            .lock()
            .map(|docs| docs.keys().filter(|(c, _)| *c == collection).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().map(|docs| docs.is_empty()).unwrap_or(true)
    }

    fn documents(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(SyncTable, String), Map<String, Value>>>, RemoteError>
    {
        if !self.online.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("memory remote is offline".into()));
        }
        self.documents
            .lock()
            .map_err(|_| RemoteError::Unavailable("memory remote lock poisoned".into()))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert(
        &self,
        collection: SyncTable,
        id: &str,
        document: &Value,
    ) -> Result<(), RemoteError> {
        let document = as_object(document)?.clone();
        self.documents()?.insert((collection, id.to_string()), document);
        Ok(())
    }

    async fn merge(&self, collection: SyncTable, id: &str, fields: &Value) -> Result<(), RemoteError> {
        let fields = as_object(fields)?;
        let mut documents = self.documents()?;
        let existing = documents
            .get_mut(&(collection, id.to_string()))
            .ok_or_else(|| RemoteError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        for (key, value) in fields {
            existing.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: SyncTable, id: &str) -> Result<(), RemoteError> {
        self.documents()?.remove(&(collection, id.to_string()));
        Ok(())
    }
}

// ==================== HTTP store ====================

/// Document store reached over HTTP.
///
/// Documents live at `{base_url}/{collection}/{id}`. Upsert is `PUT`, merge is
/// `PATCH` and delete is `DELETE`, all with JSON bodies.
pub struct HttpRemote {
    client: Client,
    base: Url,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url).map_err(|_| RemoteError::InvalidUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rentready/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn document_url(&self, collection: SyncTable, id: &str) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(collection.as_str())
            .push(id);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<(), RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn upsert(
        &self,
        collection: SyncTable,
        id: &str,
        document: &Value,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id)?;
        debug!("PUT {}", url);
        let response = self.client.put(url).json(document).send().await?;
        Self::check(response).await
    }

    async fn merge(&self, collection: SyncTable, id: &str, fields: &Value) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id)?;
        debug!("PATCH {}", url);
        let response = self.client.patch(url).json(fields).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Self::check(response).await
    }

    async fn delete(&self, collection: SyncTable, id: &str) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id)?;
        debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_memory_upsert_overwrites() {
        let remote = MemoryRemote::new();
        remote
            .upsert(SyncTable::Items, "a", &json!({"id": "a", "name": "Tent", "stock": 2}))
            .await
            .unwrap();
        remote
            .upsert(SyncTable::Items, "a", &json!({"id": "a", "name": "Tent XL"}))
            .await
            .unwrap();

        assert_eq!(
            remote.get(SyncTable::Items, "a").unwrap(),
            json!({"id": "a", "name": "Tent XL"})
        );
        assert_eq!(remote.len(SyncTable::Items), 1);
        assert_eq!(remote.len(SyncTable::Rentals), 0);
    }

    #[tokio::test]
    async fn test_memory_merge_requires_existing_document() {
        let remote = MemoryRemote::new();
        let err = remote
            .merge(SyncTable::Rentals, "r", &json!({"status": "completed"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { .. }));

        remote
            .upsert(SyncTable::Rentals, "r", &json!({"id": "r", "status": "active", "totalCost": 10}))
            .await
            .unwrap();
        remote
            .merge(SyncTable::Rentals, "r", &json!({"id": "r", "status": "completed"}))
            .await
            .unwrap();

        assert_eq!(
            remote.get(SyncTable::Rentals, "r").unwrap(),
            json!({"id": "r", "status": "completed", "totalCost": 10})
        );
    }

    #[tokio::test]
    async fn test_memory_delete_missing_is_ok() {
        let remote = MemoryRemote::new();
        remote.delete(SyncTable::Items, "ghost").await.unwrap();
        assert!(remote.is_empty());
    }

    #[tokio::test]
    async fn test_memory_offline_fails() {
        let remote = MemoryRemote::new();
        remote.set_online(false);
        let err = remote
            .upsert(SyncTable::Items, "a", &json!({"id": "a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_non_object_payload_is_malformed() {
        let remote = MemoryRemote::new();
        let err = remote
            .upsert(SyncTable::Items, "a", &json!(["not", "an", "object"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::MalformedPayload(_)));
    }

    #[test]
    fn test_http_document_url() {
        let remote = HttpRemote::new("https://store.example.com/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            remote.document_url(SyncTable::Rentals, "r 1").unwrap().as_str(),
            "https://store.example.com/api/rentals/r%201"
        );

        let remote = HttpRemote::new("http://localhost:8080", Duration::from_secs(5)).unwrap();
        assert_eq!(
            remote.document_url(SyncTable::Items, "seed-1").unwrap().as_str(),
            "http://localhost:8080/items/seed-1"
        );
    }

    async fn mock_remote() -> (MockServer, HttpRemote) {
        let server = MockServer::start().await;
        let remote = HttpRemote::new(&server.uri(), Duration::from_secs(5)).unwrap();
        (server, remote)
    }

    #[tokio::test]
    async fn test_http_upsert_puts_document() {
        let (server, remote) = mock_remote().await;
        let document = json!({"id": "seed-1", "name": "Canon EOS R5", "stock": 5});

        Mock::given(method("PUT"))
            .and(path("/items/seed-1"))
            .and(body_json(&document))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        remote.upsert(SyncTable::Items, "seed-1", &document).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_merge_patches_fields() {
        let (server, remote) = mock_remote().await;
        let fields = json!({"id": "r-1", "status": "completed"});

        Mock::given(method("PATCH"))
            .and(path("/rentals/r-1"))
            .and(body_json(&fields))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        remote.merge(SyncTable::Rentals, "r-1", &fields).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_merge_missing_document_is_not_found() {
        let (server, remote) = mock_remote().await;

        Mock::given(method("PATCH"))
            .and(path("/items/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = remote
            .merge(SyncTable::Items, "ghost", &json!({"stock": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { collection: SyncTable::Items, .. }));
    }

    #[tokio::test]
    async fn test_http_delete_missing_document_succeeds() {
        let (server, remote) = mock_remote().await;

        Mock::given(method("DELETE"))
            .and(path("/rentals/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rentals/r-2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        remote.delete(SyncTable::Rentals, "gone").await.unwrap();
        remote.delete(SyncTable::Rentals, "r-2").await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_status_is_rejected() {
        let (server, remote) = mock_remote().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = remote
            .upsert(SyncTable::Items, "a", &json!({"id": "a"}))
            .await
            .unwrap_err();
        match err {
            RemoteError::Rejected { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "database locked");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }

        let err = remote
            .merge(SyncTable::Items, "a", &json!({"stock": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 409, .. }));

        let err = remote.delete(SyncTable::Items, "a").await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 403, .. }));
    }

    #[test]
    fn test_http_rejects_bad_base_url() {
        assert!(matches!(
            HttpRemote::new("not a url", Duration::from_secs(5)),
            Err(RemoteError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpRemote::new("mailto:ops@example.com", Duration::from_secs(5)),
            Err(RemoteError::InvalidUrl(_))
        ));
    }
}
