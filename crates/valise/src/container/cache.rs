// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev

//! Recently-read value cache.
//!
//! A small LRU in front of the locked read path. Mutations invalidate the
//! affected name; `clear` empties the cache wholesale. Hit/miss counters
//! feed the container's stats surface.

use crate::value::Value;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default LRU capacity. Small on purpose: the cache targets hot keys, the
/// hash index already serves cold keys in O(1).
const CAPACITY: usize = 32;

pub(crate) struct ValueCache {
    inner: Mutex<LruCache<Arc<str>, Arc<Value>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ValueCache {
    pub(crate) fn new() -> Self {
        let capacity = NonZeroUsize::new(CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Value>> {
        let mut cache = self.inner.lock();
        match cache.get(name) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub(crate) fn put(&self, name: Arc<str>, value: Arc<Value>) {
        self.inner.lock().put(name, value);
    }

    pub(crate) fn invalidate(&self, name: &str) {
        self.inner.lock().pop(name);
    }

    pub(crate) fn clear(&self) {
        self.inner.lock().clear();
    }

    pub(crate) fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_miss_accounting() {
        let cache = ValueCache::new();
        assert!(cache.get("absent").is_none());
        cache.put(Arc::from("k"), Arc::new(Value::new("k", 1i32)));
        assert!(cache.get("k").is_some());
        let (hits, misses) = cache.stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 1);
    }

    #[test]
    fn test_invalidate_drops_entry() {
        let cache = ValueCache::new();
        cache.put(Arc::from("k"), Arc::new(Value::new("k", 1i32)));
        cache.invalidate("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_lru_evicts_oldest() {
        let cache = ValueCache::new();
        for i in 0..=CAPACITY {
            let name: Arc<str> = Arc::from(format!("k{i}"));
            cache.put(name.clone(), Arc::new(Value::new(&*name, i as i32)));
        }
        // First key inserted must be evicted once capacity is exceeded.
        assert!(cache.get("k0").is_none());
    }
}
