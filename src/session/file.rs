//! File-backed session store, one JSON document per session.
//!
//! File name is the hex SHA-256 of the session id, so ids never reach the
//! filesystem as path components. Content:
//! `{"created_at": <unix secs>, "data": {...}}`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{SESSION_MAX_AGE, SessionBackend, SessionData};

#[derive(Serialize, Deserialize)]
struct StoredSession {
    created_at: u64,
    data: SessionData,
}

pub struct FileBackend {
    dir: PathBuf,
    max_age: Duration,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl FileBackend {
    /// Create the backend, making sure the directory exists.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::open_with_max_age(dir, SESSION_MAX_AGE)
    }

    pub fn open_with_max_age(dir: impl Into<PathBuf>, max_age: Duration) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_age })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        let digest = Sha256::digest(session_id.as_bytes());
        self.dir.join(format!("{digest:x}.json"))
    }

    async fn read(&self, session_id: &str) -> Option<StoredSession> {
        let bytes = tokio::fs::read(self.path_for(session_id)).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::warn!("Discarding unreadable session file: {}", e);
                None
            }
        }
    }
}

impl SessionBackend for FileBackend {
    async fn load(&self, session_id: &str) -> Option<SessionData> {
        let stored = self.read(session_id).await?;

        if now_secs().saturating_sub(stored.created_at) > self.max_age.as_secs() {
            self.delete(session_id).await;
            return None;
        }

        Some(stored.data)
    }

    async fn save(&self, session_id: &str, data: &SessionData) {
        let created_at = self
            .read(session_id)
            .await
            .map(|s| s.created_at)
            .unwrap_or_else(now_secs);

        let stored = StoredSession {
            created_at,
            data: data.clone(),
        };
        let json = match serde_json::to_vec(&stored) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("Failed to serialize session data: {}", e);
                return;
            }
        };

        // Write-then-rename so readers never see a half-written file.
        let path = self.path_for(session_id);
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::write(&tmp, json).await {
            tracing::error!("Failed to write session file {}: {}", tmp.display(), e);
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            tracing::error!("Failed to store session file {}: {}", path.display(), e);
        }
    }

    async fn delete(&self, session_id: &str) {
        match tokio::fs::remove_file(self.path_for(session_id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Failed to delete session file: {}", e),
        }
    }

    /// Removes expired and unreadable session files. Other files are left alone.
    async fn purge_expired(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to scan session dir {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let now = now_secs();
        let mut purged = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let expired = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<StoredSession>(&bytes)
                    .map(|s| now.saturating_sub(s.created_at) > self.max_age.as_secs())
                    .unwrap_or(true),
                Err(_) => continue,
            };
            if expired && tokio::fs::remove_file(&path).await.is_ok() {
                purged += 1;
            }
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        let mut data = SessionData::new();
        data.set("access_token", json!("tok1"));
        data.set("user_data", json!({"id": "u1", "firstName": "Ana"}));
        backend.save("sid", &data).await;

        // A fresh backend over the same directory sees the session
        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.load("sid").await, Some(data));
    }

    #[tokio::test]
    async fn test_file_name_is_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.save("../../etc/passwd", &SessionData::new()).await;

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].len(), 64 + ".json".len());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.delete("never-saved").await;
        assert!(backend.load("never-saved").await.is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.save("sid", &SessionData::new()).await;
        let first = backend.read("sid").await.unwrap().created_at;

        let mut data = SessionData::new();
        data.set("k", json!("v"));
        backend.save("sid", &data).await;
        let stored = backend.read("sid").await.unwrap();
        assert_eq!(stored.created_at, first);
        assert_eq!(stored.data, data);
    }

    #[tokio::test]
    async fn test_expired_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        let stale = StoredSession {
            created_at: now_secs() - SESSION_MAX_AGE.as_secs() - 1,
            data: SessionData::new(),
        };
        std::fs::write(backend.path_for("old"), serde_json::to_vec(&stale).unwrap()).unwrap();

        assert!(backend.load("old").await.is_none());
        assert!(!backend.path_for("old").exists());
    }

    #[tokio::test]
    async fn test_purge_sweeps_abandoned_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        for id in ["gone-1", "gone-2"] {
            let stale = StoredSession {
                created_at: now_secs() - SESSION_MAX_AGE.as_secs() - 60,
                data: SessionData::new(),
            };
            std::fs::write(backend.path_for(id), serde_json::to_vec(&stale).unwrap()).unwrap();
        }
        std::fs::write(backend.path_for("garbled"), b"{not json").unwrap();
        backend.save("live", &SessionData::new()).await;
        std::fs::write(dir.path().join("README"), b"not a session").unwrap();

        assert_eq!(backend.purge_expired().await, 3);
        assert!(backend.load("live").await.is_some());
        assert!(!backend.path_for("gone-1").exists());
        assert!(dir.path().join("README").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        std::fs::write(backend.path_for("bad"), b"{not json").unwrap();
        assert!(backend.load("bad").await.is_none());
    }
}
