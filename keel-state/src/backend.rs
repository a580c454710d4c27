//! State backend trait and error types

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_core::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::StateFile;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// Refuses to overwrite a state file from another history
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    /// Refuses to overwrite a newer state
    #[error("Stale state: serial {actual} is not newer than stored serial {stored}")]
    StaleSerial { stored: u64, actual: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    pub fn locked(lock: &StateLock) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }

    pub fn unsupported_backend(backend_type: impl Into<String>) -> Self {
        Self::UnsupportedBackend(backend_type.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A held state lock. Release and force-unlock match on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateLock {
    pub id: String,
    /// Operation holding the lock (e.g., "apply", "import")
    pub operation: String,
    /// `user@host`
    pub who: String,
    pub expires: DateTime<Utc>,
}

impl StateLock {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires
    }
}

/// Storage for the state file and its lock
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// `None` before the first write
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Store `state`. Its serial must be newer than the stored one and its
    /// lineage must match.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Fails with `Locked` while another unexpired lock is held. Of several
    /// concurrent callers at most one succeeds.
    async fn acquire_lock(&self, operation: &str) -> BackendResult<StateLock>;

    async fn release_lock(&self, lock: &StateLock) -> BackendResult<()>;

    /// Remove a lock by id regardless of its owner
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;
}

/// Backend selection plus backend-specific settings
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Backend type (e.g., "local")
    pub backend_type: String,
    pub attributes: BTreeMap<String, Value>,
}

impl BackendConfig {
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: backend_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_i64)
    }
}
