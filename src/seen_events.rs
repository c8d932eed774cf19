//! Bounded dedup cache for witnessed events.
//!
//! Session-scoped: entries are not persisted across restarts. Capacity
//! and TTL limits keep memory bounded under long runtimes or
//! adversarial event volume. Each watcher owns one cache behind an
//! `Arc<Mutex<_>>`; the status endpoint only reads entry counts.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

const DEFAULT_MAX_SIZE: usize = 100_000;
const DEFAULT_TTL_SECS: u64 = 86_400; // 24 hours

/// Bounded cache of event keys with TTL and max-size eviction.
///
/// - **Max capacity:** when full, the oldest entry is evicted on insert.
/// - **TTL:** expired entries are dropped before insertion and ignored
///   by lookups.
pub struct SeenEventCache<K: Eq + Hash + Clone> {
    map: HashMap<K, Instant>,
    max_size: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone> Default for SeenEventCache<K> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL_SECS)
    }
}

impl<K: Eq + Hash + Clone> SeenEventCache<K> {
    pub fn new(max_size: usize, ttl_secs: u64) -> Self {
        Self {
            map: HashMap::new(),
            max_size,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.get(key).is_some_and(|&t| t.elapsed() < self.ttl)
    }

    pub fn insert(&mut self, key: K) {
        let now = Instant::now();
        self.map
            .retain(|_, &mut t| now.duration_since(t) < self.ttl);
        while self.map.len() >= self.max_size && !self.map.is_empty() {
            let oldest = self
                .map
                .iter()
                .min_by_key(|(_, t)| *t)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                self.map.remove(&k);
            } else {
                break;
            }
        }
        self.map.insert(key, now);
    }

    /// Check-and-record in one step. Returns true if the key was
    /// already present (a duplicate).
    pub fn check_and_insert(&mut self, key: K) -> bool {
        if self.contains(&key) {
            return true;
        }
        self.insert(key);
        false
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
