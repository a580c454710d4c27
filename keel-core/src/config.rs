//! Dispatcher timeouts and poll cadence

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::refresh::{DEFAULT_POLL_DELAY, DEFAULT_POLL_MIN_INTERVAL};

/// Timeouts applied by the [`Dispatcher`](crate::dispatcher::Dispatcher).
///
/// Serialized as whole seconds:
///
/// ```json
/// { "create_timeout": 1800, "delete_timeout": 600, "poll_delay": 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    #[serde(with = "seconds")]
    pub create_timeout: Duration,
    #[serde(with = "seconds")]
    pub update_timeout: Duration,
    #[serde(with = "seconds")]
    pub delete_timeout: Duration,
    /// Budget handed to `call_error` hooks for retrying a failed call
    #[serde(with = "seconds")]
    pub call_retry_timeout: Duration,
    #[serde(with = "seconds")]
    pub poll_delay: Duration,
    #[serde(with = "seconds")]
    pub poll_min_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(30 * 60),
            update_timeout: Duration::from_secs(30 * 60),
            delete_timeout: Duration::from_secs(15 * 60),
            call_retry_timeout: Duration::from_secs(15 * 60),
            poll_delay: DEFAULT_POLL_DELAY,
            poll_min_interval: DEFAULT_POLL_MIN_INTERVAL,
        }
    }
}

impl DispatcherConfig {
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    pub fn with_delete_timeout(mut self, timeout: Duration) -> Self {
        self.delete_timeout = timeout;
        self
    }

    pub fn with_call_retry_timeout(mut self, timeout: Duration) -> Self {
        self.call_retry_timeout = timeout;
        self
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn with_poll_min_interval(mut self, interval: Duration) -> Self {
        self.poll_min_interval = interval;
        self
    }
}

mod seconds {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
