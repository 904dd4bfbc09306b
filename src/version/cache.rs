use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory cache whose entries expire after a per-entry TTL
///
/// A read after the expiry timestamp behaves as a miss. Concurrent
/// writers race on the same key and the last one wins.
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key` until `ttl` has elapsed
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        debug!("Caching {} for {:?}", key, ttl);
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Get the value for `key`, or `None` if it is missing or expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
        }

        // Keep an entry that was replaced after the read
        self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
        None
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including ones that expired but were not read since
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
