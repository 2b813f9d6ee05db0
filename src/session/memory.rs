//! In-memory session backend for development and testing.
//!
//! Uses `DashMap` for concurrent access without external locks.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{SESSION_MAX_AGE, SessionBackend, SessionData};

/// In-memory session store.
///
/// Sessions are lost on restart and not shared across processes.
pub struct InMemoryBackend {
    store: DashMap<String, (SessionData, Instant)>,
    max_age: Duration,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_max_age(SESSION_MAX_AGE)
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            store: DashMap::new(),
            max_age,
        }
    }

    /// Number of sessions currently stored (including expired).
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for InMemoryBackend {
    async fn load(&self, session_id: &str) -> Option<SessionData> {
        let entry = self.store.get(session_id)?;
        let (data, created) = entry.value();

        if created.elapsed() > self.max_age {
            drop(entry); // release the shard lock before removing
            self.store.remove(session_id);
            return None;
        }

        Some(data.clone())
    }

    async fn save(&self, session_id: &str, data: &SessionData) {
        let created = self
            .store
            .get(session_id)
            .map(|e| e.value().1)
            .unwrap_or_else(Instant::now);

        self.store
            .insert(session_id.to_string(), (data.clone(), created));
    }

    async fn delete(&self, session_id: &str) {
        self.store.remove(session_id);
    }

    async fn purge_expired(&self) -> usize {
        let mut purged = 0;
        self.store.retain(|_, (_, created)| {
            let alive = created.elapsed() <= self.max_age;
            if !alive {
                purged += 1;
            }
            alive
        });
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_with(key: &str, value: serde_json::Value) -> SessionData {
        let mut data = SessionData::new();
        data.set(key, value);
        data
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let backend = InMemoryBackend::new();
        backend.save("s1", &data_with("access_token", json!("tok"))).await;

        let loaded = backend.load("s1").await.unwrap();
        assert_eq!(loaded.get("access_token").unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_load_unknown_is_none() {
        assert!(InMemoryBackend::new().load("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_delete_twice_is_fine() {
        let backend = InMemoryBackend::new();
        backend.save("s1", &SessionData::new()).await;
        backend.delete("s1").await;
        backend.delete("s1").await;
        assert!(backend.load("s1").await.is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_lifetime_is_absolute() {
        let backend = InMemoryBackend::new();
        backend.save("s1", &data_with("v", json!(1))).await;
        let created = backend.store.get("s1").unwrap().value().1;

        backend.save("s1", &data_with("v", json!(2))).await;
        assert_eq!(backend.store.get("s1").unwrap().value().1, created);
        assert_eq!(backend.load("s1").await.unwrap().get("v").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expired_record_is_dropped() {
        let backend = InMemoryBackend::with_max_age(Duration::from_secs(0));
        backend.save("s1", &SessionData::new()).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(backend.load("s1").await.is_none());
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test]
    async fn test_purge_removes_abandoned_sessions() {
        let backend = InMemoryBackend::with_max_age(Duration::from_millis(50));
        backend.save("abandoned-1", &SessionData::new()).await;
        backend.save("abandoned-2", &SessionData::new()).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        backend.save("fresh", &data_with("v", json!(1))).await;

        assert_eq!(backend.purge_expired().await, 2);
        assert_eq!(backend.len(), 1);
        assert!(backend.load("fresh").await.is_some());
        assert_eq!(backend.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let backend = InMemoryBackend::new();
        backend.save("a", &data_with("user", json!("ana"))).await;
        backend.save("b", &data_with("user", json!("ben"))).await;

        backend.delete("a").await;
        assert!(backend.load("a").await.is_none());
        assert_eq!(backend.load("b").await.unwrap().get("user").unwrap(), "ben");
    }
}
