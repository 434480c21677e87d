use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

/// Bounded in-memory TTL cache (the L1 tier).
///
/// Reads are lock-free via `DashMap`; expired entries are dropped on read
/// and swept when an insert finds the cache at capacity. When a sweep is
/// not enough, the oldest entry goes.
pub struct TtlCache<T> {
    entries: DashMap<String, Entry<T>>,
    ttl: Duration,
    capacity: usize,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => {
                if entry.inserted_at.elapsed() <= self.ttl {
                    return Some(entry.value.clone());
                }
                true
            }
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: &str, value: T) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(key) {
            self.evict();
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    fn evict(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.inserted_at.elapsed() <= ttl);

        if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().inserted_at)
                .map(|e| e.key().clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
