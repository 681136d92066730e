//! Usage: Durable key-value state for the signed-in account (`user_id`, `user_role`).

use crate::shared::error::{AppError, AppResult, CODE_SESSION_STORE};
use crate::shared::mutex_ext::MutexExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub user_id: i64,
    pub user_role: String,
}

/// Backing store for [`crate::Session`]. Implementations must be safe to share across threads.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> AppResult<Option<StoredSession>>;
    fn save(&self, session: &StoredSession) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

fn store_err(message: String) -> AppError {
    AppError::new(CODE_SESSION_STORE, message)
}

/// JSON file in the data dir, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SESSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| SESSION_FILE_NAME.to_string());
        self.path.with_file_name(format!("{name}.{suffix}"))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> AppResult<Option<StoredSession>> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_err(format!("failed to read session file: {e}"))),
        };

        match serde_json::from_slice::<StoredSession>(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // Unreadable file reads as signed out.
                tracing::warn!(path = %self.path.display(), "ignoring corrupt session file: {e}");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &StoredSession) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| store_err(format!("failed to create session dir: {e}")))?;
        }

        let tmp_path = self.sibling("tmp");
        let backup_path = self.sibling("bak");

        let content = serde_json::to_vec_pretty(session)
            .map_err(|e| store_err(format!("failed to serialize session: {e}")))?;

        std::fs::write(&tmp_path, content)
            .map_err(|e| store_err(format!("failed to write temp session file: {e}")))?;

        if backup_path.exists() {
            let _ = std::fs::remove_file(&backup_path);
        }

        if self.path.exists() {
            std::fs::rename(&self.path, &backup_path)
                .map_err(|e| store_err(format!("failed to create session backup: {e}")))?;
        }

        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::rename(&backup_path, &self.path);
            return Err(store_err(format!("failed to finalize session file: {e}")));
        }

        if backup_path.exists() {
            let _ = std::fs::remove_file(&backup_path);
        }

        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_err(format!("failed to remove session file: {e}"))),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> AppResult<Option<StoredSession>> {
        Ok(self.inner.lock_or_recover().clone())
    }

    fn save(&self, session: &StoredSession) -> AppResult<()> {
        *self.inner.lock_or_recover() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self.inner.lock_or_recover() = None;
        Ok(())
    }
}
