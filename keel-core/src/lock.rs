//! Lock - Named mutual exclusion for calls against a shared parent resource
//!
//! Every key maps to one async mutex for the lifetime of the registry. Calls
//! holding the same key never overlap; different keys never contend.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use log::debug;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `fut` while holding the lock for `key`. An empty key runs unlocked.
    ///
    /// The guard is released when `fut` completes, fails, or is dropped.
    pub async fn with_lock<F, T>(&self, key: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        if key.is_empty() {
            return fut.await;
        }

        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        debug!("acquired lock '{}'", key);
        fut.await
    }

    /// Number of keys ever locked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
