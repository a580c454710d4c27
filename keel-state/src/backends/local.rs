//! Local file backend
//!
//! State lives in a JSON file (default `keel.state.json`); the lock is a
//! sibling `.lock` file holding a [`StateLock`]. The lock file is created
//! exclusively, so only one of several racing writers gets it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend, StateLock};
use crate::state::StateFile;

/// Locks left behind by a crashed run expire after this long (15 minutes)
const DEFAULT_LOCK_TIMEOUT_SECS: i64 = 900;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "keel.state.json";

    pub fn with_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
            lock_timeout: Duration::seconds(DEFAULT_LOCK_TIMEOUT_SECS),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Attributes: `path` (state file), `lock_timeout` (seconds)
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let path = config.get_string("path").unwrap_or(Self::DEFAULT_STATE_FILE);
        let mut backend = Self::with_path(path);
        if let Some(secs) = config.get_i64("lock_timeout") {
            if secs <= 0 {
                return Err(BackendError::configuration(format!(
                    "lock_timeout must be positive, got {}",
                    secs
                )));
            }
            backend = backend.with_lock_timeout(Duration::seconds(secs));
        }
        Ok(backend)
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn read_lock(&self) -> BackendResult<Option<StateLock>> {
        read_json(&self.lock_path, "lock").await
    }

    fn new_lock(&self, operation: &str) -> StateLock {
        StateLock {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            who: lock_owner(),
            expires: Utc::now() + self.lock_timeout,
        }
    }

    /// Publish `lock` only if no lock file exists. `Ok(false)` when one does.
    ///
    /// The lock is written in full to a private file created with
    /// `create_new`, then hard-linked into place. Linking fails if the lock
    /// file exists, and readers never see a partly written lock.
    async fn create_lock_file(&self, lock: &StateLock) -> BackendResult<bool> {
        let content = serde_json::to_string_pretty(lock)
            .map_err(|e| BackendError::Serialization(format!("Failed to serialize lock: {}", e)))?;
        let staging = self.lock_path.with_extension(format!("lock.{}", lock.id));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to create lock file: {}", e)))?;
        let written: std::io::Result<()> = async {
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::hard_link(&staging, &self.lock_path).await
        }
        .await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            warn!("Failed to remove {}: {}", staging.display(), e);
        }

        match written {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(BackendError::Io(format!("Failed to write lock file: {}", e))),
        }
    }
}

fn lock_owner() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> BackendResult<Option<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BackendError::Io(format!("Failed to read {} file: {}", what, e))),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| BackendError::InvalidState(format!("Failed to parse {} file: {}", what, e)))
}

async fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> BackendResult<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| BackendError::Serialization(format!("Failed to serialize {}: {}", what, e)))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| BackendError::Io(format!("Failed to write {} file: {}", what, e)))
}

#[async_trait]
impl StateBackend for LocalBackend {
    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        read_json(&self.state_path, "state").await
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        if let Some(stored) = self.read_state().await? {
            if stored.lineage != state.lineage {
                return Err(BackendError::LineageMismatch {
                    expected: stored.lineage,
                    actual: state.lineage.clone(),
                });
            }
            if state.serial <= stored.serial {
                return Err(BackendError::StaleSerial {
                    stored: stored.serial,
                    actual: state.serial,
                });
            }
        }
        debug!("Writing state serial {} to {}", state.serial, self.state_path.display());
        write_json(&self.state_path, state, "state").await
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<StateLock> {
        let lock = self.new_lock(operation);
        if self.create_lock_file(&lock).await? {
            debug!("Acquired state lock {} for {}", lock.id, operation);
            return Ok(lock);
        }

        match self.read_lock().await {
            Ok(Some(existing)) if !existing.is_expired() => {
                return Err(BackendError::locked(&existing));
            }
            Ok(Some(existing)) => warn!("Replacing expired lock {} held by {}", existing.id, existing.who),
            // released between our create and read
            Ok(None) => {}
            Err(BackendError::InvalidState(message)) => warn!("Replacing unreadable lock: {}", message),
            Err(e) => return Err(e),
        }
        match tokio::fs::remove_file(&self.lock_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(BackendError::Io(format!("Failed to remove lock file: {}", e))),
        }

        // one retry; losing it to another writer means that writer holds the lock
        if self.create_lock_file(&lock).await? {
            debug!("Acquired state lock {} for {}", lock.id, operation);
            return Ok(lock);
        }
        match self.read_lock().await? {
            Some(existing) => Err(BackendError::locked(&existing)),
            None => Err(BackendError::Io("Lock file vanished while acquiring".to_string())),
        }
    }

    async fn release_lock(&self, lock: &StateLock) -> BackendResult<()> {
        let existing = self
            .read_lock()
            .await?
            .ok_or_else(|| BackendError::LockNotFound(lock.id.clone()))?;
        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }
        self.force_unlock(&lock.id).await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        match self.read_lock().await {
            Ok(None) => return Err(BackendError::LockNotFound(lock_id.to_string())),
            Ok(Some(existing)) if existing.id != lock_id => {
                return Err(BackendError::LockMismatch {
                    expected: lock_id.to_string(),
                    actual: existing.id,
                });
            }
            // an unreadable lock file can always be removed
            Ok(Some(_)) | Err(BackendError::InvalidState(_)) => {}
            Err(e) => return Err(e),
        }
        tokio::fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }
}
