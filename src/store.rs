//! Short-lived key/value state shared by request handlers.
//!
//! The contact rate limiter and the GitHub snapshot cache both need
//! "process-wide state with a bounded lifetime per key". They talk to it
//! through [`TtlStore`] so the in-memory backend used here can be swapped
//! for an external one when the service runs as more than one instance.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Result of a fixed-window counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// Hits recorded in the current window, including this one.
    pub count: u64,
    /// Time until the window closes and the count starts over.
    pub resets_in: Duration,
}

#[async_trait]
pub trait TtlStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn remove(&self, key: &str);

    /// Bump the counter stored under `key`. A missing or expired key starts
    /// a new window of length `window` at count 1.
    async fn increment(&self, key: &str, window: Duration) -> Counter;
}

#[derive(Debug, Clone)]
enum Slot {
    Value(Value),
    Count(u64),
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Per-process [`TtlStore`]. Not shared across instances.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries. Expired entries are dropped first.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));
        entries.len()
    }
}

#[async_trait]
impl TtlStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(Entry {
                slot: Slot::Value(v),
                expires_at,
            }) if now < *expires_at => Some(v.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // Evict on write so the map stays proportional to live keys.
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Value(value),
                expires_at: now + ttl,
            },
        );
    }

    async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn increment(&self, key: &str, window: Duration) -> Counter {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            slot: Slot::Count(0),
            expires_at: now + window,
        });

        let count = match &mut entry.slot {
            Slot::Count(n) => {
                *n += 1;
                *n
            }
            slot => {
                // A plain value under a counter key is overwritten.
                *slot = Slot::Count(1);
                entry.expires_at = now + window;
                1
            }
        };

        Counter {
            count,
            resets_in: entry.expires_at.saturating_duration_since(now),
        }
    }
}
