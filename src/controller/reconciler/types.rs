//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::conditions::ConditionReason;
use crate::controller::reconciler::sync::SyncEngine;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A step failed; the reason has already been persisted in status
    #[error("Sync failed: {reason}")]
    SyncFailed { reason: ConditionReason },
    #[error("Failed to persist SecretSync status: {0:#}")]
    StatusUpdate(#[source] anyhow::Error),
    #[error("Reconciliation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Backoff map key for a resource
#[must_use]
pub fn resource_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Shared reconciliation context
pub struct Reconciler {
    pub engine: SyncEngine,
    pub config: ControllerConfig,
    // Backoff state per resource (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(engine: SyncEngine, config: ControllerConfig) -> Self {
        Self {
            engine,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying
    pub fn next_backoff(&self, key: &str) -> (Duration, u32) {
        let Ok(mut states) = self.backoff_states.lock() else {
            return (
                Duration::from_secs(self.config.backoff_min_minutes.max(1) * 60),
                0,
            );
        };
        let state = states.entry(key.to_string()).or_insert_with(|| {
            BackoffState::new(
                self.config.backoff_min_minutes,
                self.config.backoff_max_minutes,
            )
        });
        state.increment_error();
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the failure history of `key`
    pub fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }
}
