//! Session store implementations.

use crate::{Result, Session, SessionError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use shopchat_core::{ChatMessage, SessionId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Trait for durable session stores.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, or return a fresh empty one for an unknown id.
    ///
    /// Loading alone never persists anything; the session row is created by
    /// the first `append`.
    async fn load(&self, id: &SessionId) -> Result<Session>;

    /// Atomically append one user/assistant message pair.
    ///
    /// Either both messages are persisted or neither is.
    async fn append(&self, id: &SessionId, user: ChatMessage, assistant: ChatMessage)
        -> Result<()>;

    /// Empty the message list, preserving the session identity.
    async fn clear(&self, id: &SessionId) -> Result<()>;

    /// Delete the session entirely.
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Delete sessions idle longer than `max_age`; returns the number
    /// deleted. Safe to run concurrently with live traffic.
    async fn sweep(&self, max_age: Duration) -> Result<usize>;

    /// Verify the backing storage is reachable.
    async fn ping(&self) -> Result<()>;
}

/// In-memory session store, for tests and embedded use.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Session> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id.as_str())
            .cloned()
            .unwrap_or_else(|| Session::new(id.clone())))
    }

    async fn append(
        &self,
        id: &SessionId,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.as_str().to_string())
            .or_insert_with(|| Session::new(id.clone()));
        session.messages.push(user);
        session.messages.push(assistant);
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn clear(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(id.as_str()) {
            session.messages.clear();
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id.as_str());
        Ok(())
    }

    async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age)
                .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        let removed = before - sessions.len();

        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// File-backed session store: one JSON file per session.
///
/// All writes go through an atomic tmp+rename, and each session has its own
/// async lock so read-modify-write cycles are serialized per session without
/// blocking unrelated sessions.
pub struct FileSessionStore {
    base_dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileSessionStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            locks: DashMap::new(),
        })
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        self.base_dir.join(format!("{}.json", id.file_stem()))
    }

    fn lock_for(&self, stem: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(stem.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn read_session(&self, path: &PathBuf, id: &SessionId) -> Result<Session> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::new(id.clone())),
            Err(e) => Err(SessionError::Unavailable(e.to_string())),
        }
    }

    async fn write_session(&self, path: &PathBuf, session: &Session) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let data = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        debug!(session = %session.id, messages = session.message_count(), "Saved session");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Session> {
        // Lock-free: writers rename atomically, so a reader always sees a
        // complete snapshot.
        let path = self.session_path(id);
        self.read_session(&path, id).await
    }

    async fn append(
        &self,
        id: &SessionId,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<()> {
        let stem = id.file_stem();
        let lock = self.lock_for(&stem);
        let _guard = lock.lock().await;

        let path = self.session_path(id);
        let mut session = self.read_session(&path, id).await?;
        session.messages.push(user);
        session.messages.push(assistant);
        session.updated_at = Utc::now();
        self.write_session(&path, &session).await
    }

    async fn clear(&self, id: &SessionId) -> Result<()> {
        let stem = id.file_stem();
        let lock = self.lock_for(&stem);
        let _guard = lock.lock().await;

        let path = self.session_path(id);
        if !path.exists() {
            return Ok(());
        }

        let mut session = self.read_session(&path, id).await?;
        session.messages.clear();
        session.updated_at = Utc::now();
        self.write_session(&path, &session).await
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let stem = id.file_stem();
        let lock = self.lock_for(&stem);
        let guard = lock.lock().await;

        let path = self.session_path(id);
        let result = match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        };

        // A deleted session gives up its lock entry too; the map must not
        // grow for the process lifetime.
        drop(guard);
        self.locks.remove(&stem);
        result
    }

    async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age)
                .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            // Re-check age under the session's lock so a session updated
            // mid-sweep is never deleted.
            let lock = self.lock_for(&stem);
            let guard = lock.lock().await;

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let session: Session = match serde_json::from_str(&content) {
                Ok(session) => session,
                Err(_) => continue,
            };

            if session.updated_at < cutoff {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
                drop(guard);
                self.locks.remove(&stem);
            }
        }

        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        if self.base_dir.is_dir() {
            Ok(())
        } else {
            Err(SessionError::Unavailable(format!(
                "session directory missing: {}",
                self.base_dir.display()
            )))
        }
    }
}
