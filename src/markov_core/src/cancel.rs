//! Cooperative cancellation for streaming runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

/// Cancellation flag shared between a run and whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// True when both handles point at the same flag.
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Tokens of the runs currently in flight, keyed by run key.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    runs: Arc<DashMap<String, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new run under `key`. A run already registered under the same
    /// key keeps its own token but is no longer reachable by `cancel`.
    pub fn register(&self, key: impl Into<String>) -> RunGuard {
        let key = key.into();
        let token = CancellationToken::new();
        self.runs.insert(key.clone(), token.clone());
        debug!(run = %key, "registered run");
        RunGuard {
            runs: Arc::clone(&self.runs),
            key,
            token,
        }
    }

    /// Flag the run under `key`. Returns false when no such run is tracked.
    pub fn cancel(&self, key: &str) -> bool {
        match self.runs.get(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.runs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Registration of one run. Dropping it releases the tracking entry.
#[derive(Debug)]
pub struct RunGuard {
    runs: Arc<DashMap<String, CancellationToken>>,
    key: String,
    token: CancellationToken,
}

impl RunGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // Leave a newer run registered under the same key alone.
        self.runs.remove_if(&self.key, |_, token| token.same_as(&self.token));
        debug!(run = %self.key, "released run");
    }
}
