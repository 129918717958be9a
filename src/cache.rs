//! Short-lived cache of rendered public index pages.
//!
//! Invalidation is time-based only: post writes do not touch the cache, so
//! a reader may see a stale index until the TTL lapses or `clear` runs.
//! Entries are keyed by request identity (path plus query string), so each
//! page number caches independently.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use crate::config;

struct Entry {
    body: Vec<u8>,
    stored_at: Instant,
}

pub struct TimelineCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl TimelineCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide instance used by the index route.
    pub fn global() -> &'static TimelineCache {
        static CACHE: OnceLock<TimelineCache> = OnceLock::new();
        CACHE.get_or_init(|| TimelineCache::new(config::index_cache_ttl()))
    }

    /// Stale entries are dropped lazily here rather than by a sweeper.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Last write wins; racing fills of the same key are wasteful, not
    /// harmful.
    pub fn put(&self, key: &str, body: Vec<u8>) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache mutex poisoned").clear();
    }
}
