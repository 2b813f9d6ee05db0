//! Server-side session management.
//!
//! Provides the `SessionBackend` trait for pluggable storage, HMAC-SHA256
//! cookie signing, and in-memory, file and DynamoDB backends. Every backend
//! enforces the same absolute lifetime: a record dies `SESSION_MAX_AGE`
//! after it was first written, however often it is updated afterwards.

pub mod cookie;
pub mod dynamodb;
pub mod file;
pub mod memory;
pub mod middleware;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Absolute session lifetime (24 hours, not sliding).
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

/// How often abandoned sessions are swept from local stores.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Session data stored server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    #[serde(flatten)]
    pub data: HashMap<String, serde_json::Value>,
}

impl SessionData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pluggable session storage backend.
///
/// `save` on an existing id keeps the record's original creation time.
pub trait SessionBackend: Send + Sync {
    /// Load session data by ID. Returns `None` if not found or expired.
    fn load(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Option<SessionData>> + Send;

    /// Save session data.
    fn save(
        &self,
        session_id: &str,
        data: &SessionData,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Delete a session. Deleting a missing session is a no-op.
    fn delete(&self, session_id: &str) -> impl std::future::Future<Output = ()> + Send;

    /// Remove every expired record, returning how many went.
    ///
    /// Stores with their own expiry (DynamoDB TTL) keep the default no-op.
    fn purge_expired(&self) -> impl std::future::Future<Output = usize> + Send {
        async { 0 }
    }
}

/// Type-erased session backend.
///
/// `SessionBackend` uses RPITIT and is not object-safe, so dispatch is
/// done by hand.
pub enum AnyBackend {
    Memory(memory::InMemoryBackend),
    File(file::FileBackend),
    DynamoDb(dynamodb::DynamoDbBackend),
}

impl SessionBackend for AnyBackend {
    async fn load(&self, session_id: &str) -> Option<SessionData> {
        match self {
            AnyBackend::Memory(b) => b.load(session_id).await,
            AnyBackend::File(b) => b.load(session_id).await,
            AnyBackend::DynamoDb(b) => b.load(session_id).await,
        }
    }

    async fn save(&self, session_id: &str, data: &SessionData) {
        match self {
            AnyBackend::Memory(b) => b.save(session_id, data).await,
            AnyBackend::File(b) => b.save(session_id, data).await,
            AnyBackend::DynamoDb(b) => b.save(session_id, data).await,
        }
    }

    async fn delete(&self, session_id: &str) {
        match self {
            AnyBackend::Memory(b) => b.delete(session_id).await,
            AnyBackend::File(b) => b.delete(session_id).await,
            AnyBackend::DynamoDb(b) => b.delete(session_id).await,
        }
    }

    async fn purge_expired(&self) -> usize {
        match self {
            AnyBackend::Memory(b) => b.purge_expired().await,
            AnyBackend::File(b) => b.purge_expired().await,
            AnyBackend::DynamoDb(b) => b.purge_expired().await,
        }
    }
}

/// Sweep expired sessions every `every` for the life of the process.
pub fn spawn_purge_task<B>(backend: Arc<B>, every: Duration) -> tokio::task::JoinHandle<()>
where
    B: SessionBackend + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = backend.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired sessions", purged);
            }
        }
    })
}
