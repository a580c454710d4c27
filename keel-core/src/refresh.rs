//! Refresh - Poll a remote resource until it reaches a terminal state
//!
//! `Polling -> {Success, Failed, TimedOut}`. The first observation happens
//! after `delay`, then every `min_interval`, until the status reaches a target
//! state, a failure state, or the timeout elapses.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use crate::error::{ReconcileError, ReconcileResult};
use crate::value::Value;

pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_MIN_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// Consecutive failure-state observations absorbed by pollers of resources
/// that pass through failure-looking states while self-healing (cluster
/// add-ons)
pub const TRANSIENT_FAILURE_TOLERANCE: u32 = 10;

/// One observation of the polled resource
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Found { item: Value, status: String },
    Gone,
}

impl RefreshOutcome {
    pub fn found(item: Value, status: impl Into<String>) -> Self {
        Self::Found {
            item,
            status: status.into(),
        }
    }
}

/// What to wait for and for how long
#[derive(Debug, Clone, PartialEq)]
pub struct StateRefresh {
    pub target: Vec<String>,
    /// When non-empty, any status outside `pending` and `target` is an error
    pub pending: Vec<String>,
    pub fail: Vec<String>,
    pub timeout: Duration,
    /// Unset values fall back to the dispatcher's poll cadence, then to
    /// [`DEFAULT_POLL_DELAY`] / [`DEFAULT_POLL_MIN_INTERVAL`]
    pub delay: Option<Duration>,
    pub min_interval: Option<Duration>,
    /// Resource to poll; defaults to the id of the resource being reconciled
    pub resource_id: Option<String>,
    pub failure_tolerance: u32,
    pub not_found_checks: u32,
    /// Succeed once the resource no longer exists
    pub until_gone: bool,
}

impl StateRefresh {
    pub fn new(target: &[&str], timeout: Duration) -> Self {
        Self {
            target: target.iter().map(|s| s.to_string()).collect(),
            pending: Vec::new(),
            fail: Vec::new(),
            timeout,
            delay: None,
            min_interval: None,
            resource_id: None,
            failure_tolerance: 0,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            until_gone: false,
        }
    }

    /// Wait for the resource to disappear
    pub fn until_gone(timeout: Duration) -> Self {
        Self {
            until_gone: true,
            ..Self::new(&[], timeout)
        }
    }

    pub fn with_pending(mut self, pending: &[&str]) -> Self {
        self.pending = pending.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_fail(mut self, fail: &[&str]) -> Self {
        self.fail = fail.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = Some(min_interval);
        self
    }

    /// Fill in whichever of `delay` and `min_interval` is unset
    pub fn or_cadence(mut self, delay: Duration, min_interval: Duration) -> Self {
        self.delay.get_or_insert(delay);
        self.min_interval.get_or_insert(min_interval);
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_failure_tolerance(mut self, tolerance: u32) -> Self {
        self.failure_tolerance = tolerance;
        self
    }

    /// Absorb up to [`TRANSIENT_FAILURE_TOLERANCE`] consecutive failure
    /// observations
    pub fn tolerate_transient_failures(self) -> Self {
        self.with_failure_tolerance(TRANSIENT_FAILURE_TOLERANCE)
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Poll `refresh` until a terminal state.
    ///
    /// Returns the last observed item on success, or `Value::Null` when
    /// waiting for removal. Errors from `refresh` abort the wait.
    pub async fn wait<F, Fut>(&self, id: &str, mut refresh: F) -> ReconcileResult<Value>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ReconcileResult<RefreshOutcome>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut failures = 0u32;
        let mut not_found = 0u32;
        let mut last_status: Option<String> = None;

        let delay = self.delay.unwrap_or(DEFAULT_POLL_DELAY);
        let min_interval = self.min_interval.unwrap_or(DEFAULT_POLL_MIN_INTERVAL);
        sleep_until_or(deadline, delay).await;

        loop {
            match refresh().await? {
                RefreshOutcome::Gone => {
                    if self.until_gone {
                        debug!("{} is gone", id);
                        return Ok(Value::Null);
                    }
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(ReconcileError::not_found("resource", id));
                    }
                    debug!("{} not found yet ({} checks)", id, not_found);
                }
                RefreshOutcome::Found { item, status } => {
                    not_found = 0;
                    debug!("{} is in state '{}'", id, status);

                    if !self.until_gone && self.target.contains(&status) {
                        return Ok(item);
                    }

                    if self.fail.contains(&status) {
                        failures += 1;
                        if failures > self.failure_tolerance {
                            return Err(ReconcileError::State {
                                id: id.to_string(),
                                status,
                            });
                        }
                        warn!(
                            "{} in failure state '{}' ({}/{} tolerated)",
                            id, status, failures, self.failure_tolerance
                        );
                    } else {
                        failures = 0;
                        if !self.until_gone
                            && !self.pending.is_empty()
                            && !self.pending.contains(&status)
                        {
                            return Err(ReconcileError::UnexpectedState {
                                id: id.to_string(),
                                status,
                                expected: self.target.clone(),
                            });
                        }
                    }
                    last_status = Some(status);
                }
            }

            if Instant::now() >= deadline {
                let waiting_for = if self.until_gone {
                    "removal".to_string()
                } else {
                    format!("state {:?}", self.target)
                };
                return Err(ReconcileError::TimedOut {
                    operation: format!(
                        "waiting for {} to reach {} (last state {:?})",
                        id, waiting_for, last_status
                    ),
                    timeout: self.timeout,
                });
            }

            sleep_until_or(deadline, min_interval).await;
        }
    }
}

/// Sleep for `interval`, but never past `deadline`
async fn sleep_until_or(deadline: Instant, interval: Duration) {
    let wake = (Instant::now() + interval).min(deadline);
    tokio::time::sleep_until(wake).await;
}
