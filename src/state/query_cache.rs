//! Reactive data cache for backend query results.
//!
//! Screens cache recipe, meal-plan and grocery queries here keyed by a query
//! string. Sign-out and session expiry wipe the whole cache so one account
//! never sees another's data.

#[cfg(test)]
#[path = "query_cache_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, Value>,
    /// Number of full clears so far.
    generation: u64,
}

/// Shared query cache. Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct QueryCache {
    inner: Arc<RwLock<CacheInner>>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.insert(key.into(), value);
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.generation += 1;
        debug!(dropped, generation = inner.generation, "query cache cleared");
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
