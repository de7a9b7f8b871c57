//! Bounded response caches
//!
//! Eviction is strictly by insertion order: reads never renew an entry.
//! The backing `LruCache` is only ever read through `peek`, so its
//! recency order stays identical to insertion order and `push` always
//! evicts the oldest-inserted entry.

use crate::query::QuerySignature;
use crate::types::{PageInfo, Product, SearchResponse};
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Capacity of the main-channel cache
pub const CACHE_MAX: usize = 30;

/// Counters exposed for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// String-keyed cache with insertion-order eviction
pub struct InsertionCache<V> {
    entries: LruCache<String, V>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<V> InsertionCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up an entry without renewing it
    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.peek(key) {
            Some(value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Insert an entry. A new key evicts the oldest-inserted entry when the
    /// cache is full and returns its key. An existing key is overwritten in
    /// place and keeps its original position.
    pub fn put(&mut self, key: String, value: V) -> Option<String> {
        if let Some(existing) = self.entries.peek_mut(&key) {
            *existing = value;
            return None;
        }
        let evicted = self.entries.push(key, value).map(|(evicted_key, _)| evicted_key);
        if let Some(evicted_key) = &evicted {
            self.evictions += 1;
            log::trace!("Evicted oldest cache entry: {}", evicted_key);
        }
        evicted
    }

    /// Keys from oldest to newest insertion
    pub fn keys_oldest_first(&self) -> Vec<String> {
        self.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.entries.len(),
        }
    }
}

/// A cached main-channel response
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: QuerySignature,
    pub products: Vec<Product>,
    pub pagination: PageInfo,
    pub inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn from_response(key: QuerySignature, response: &SearchResponse) -> Self {
        Self {
            key,
            products: response.products.clone(),
            pagination: response.pagination,
            inserted_at: Utc::now(),
        }
    }
}

/// Main-channel cache keyed by the full query signature
pub struct ResponseCache {
    inner: InsertionCache<CacheEntry>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: InsertionCache::new(capacity),
        }
    }

    pub fn get(&mut self, signature: &QuerySignature) -> Option<&CacheEntry> {
        self.inner.get(&signature.key())
    }

    pub fn put(&mut self, signature: QuerySignature, entry: CacheEntry) -> Option<String> {
        self.inner.put(signature.key(), entry)
    }

    pub fn contains(&self, signature: &QuerySignature) -> bool {
        self.inner.contains(&signature.key())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CACHE_MAX)
    }
}
