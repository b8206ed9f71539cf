//! Velocity counters used as risk signals
//!
//! Counters are keyed `{scope}:{identity}` and reset when their window
//! elapses (sliding-window-by-reset, not a sliding log). A counter store
//! failure never fails the evaluation: the limiter returns a zero signal
//! and logs the degradation.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use riskgate_core::clamp01;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Outcome of one velocity increment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityResult {
    /// Count within the current window, after this increment
    pub count: i64,

    /// Risk score: 0 until the limit is exceeded, then linear,
    /// saturating at 1.0 when count >= 2 * limit
    pub score: f64,
}

impl VelocityResult {
    /// Zero signal used when the store is unavailable
    pub fn zero() -> Self {
        Self {
            count: 0,
            score: 0.0,
        }
    }
}

/// Atomic counter store collaborator.
///
/// Correctness under concurrent increments depends on the store's
/// increment being atomic, not on external locking.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter and return the new count
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Set the counter's time-to-live; the counter resets after `ttl`
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Delete the counter
    async fn remove(&self, key: &str) -> Result<()>;
}

struct CounterEntry {
    count: i64,
    deadline: Option<Instant>,
}

/// In-memory counter store.
///
/// Atomicity comes from holding the write lock across the
/// check-expiry-then-increment sequence.
pub struct MemoryCounterStore {
    entries: Arc<RwLock<HashMap<String, CounterEntry>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<i64> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| EngineError::Store(format!("lock poisoned: {}", e)))?;

        let now = Instant::now();
        let entry = entries.entry(key.to_string()).or_insert(CounterEntry {
            count: 0,
            deadline: None,
        });

        if let Some(deadline) = entry.deadline {
            if now >= deadline {
                entry.count = 0;
                entry.deadline = None;
            }
        }

        entry.count += 1;
        Ok(entry.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| EngineError::Store(format!("lock poisoned: {}", e)))?;

        if let Some(entry) = entries.get_mut(key) {
            entry.deadline = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| EngineError::Store(format!("lock poisoned: {}", e)))?;

        entries.remove(key);
        Ok(())
    }
}

/// TTL-windowed velocity limiter over a [`CounterStore`]
#[derive(Clone)]
pub struct VelocityLimiter {
    store: Arc<dyn CounterStore>,
}

impl VelocityLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Increment the `{scope}:{identity}` counter and score it.
    ///
    /// Never fails: store errors degrade to a zero signal.
    pub async fn increment(
        &self,
        scope: &str,
        identity: &str,
        window: Duration,
        limit: i64,
    ) -> VelocityResult {
        let key = format!("vel:{}:{}", scope, identity);
        match self.try_increment(&key, window, limit).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "velocity store unavailable, failing open");
                VelocityResult::zero()
            }
        }
    }

    async fn try_increment(
        &self,
        key: &str,
        window: Duration,
        limit: i64,
    ) -> Result<VelocityResult> {
        let count = self.store.increment(key).await?;

        // The increment that creates the counter owns the window. Only
        // that call sets the TTL, so a counter left behind without one
        // would never reset; if the TTL cannot be set, discard the
        // counter so the next increment recreates it and tries again.
        if count == 1 {
            if let Err(e) = self.store.expire(key, window).await {
                tracing::warn!(key = %key, error = %e, "failed to set velocity window, discarding counter");
                if let Err(e) = self.store.remove(key).await {
                    tracing::warn!(key = %key, error = %e, "failed to discard unwindowed counter");
                }
            }
        }

        let score = if limit <= 0 {
            0.0
        } else {
            clamp01((count - limit) as f64 / limit as f64)
        };

        Ok(VelocityResult { count, score })
    }
}
