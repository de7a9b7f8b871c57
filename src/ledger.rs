//! Recent-search ledger
//!
//! Most-recent-first list of committed queries, case-insensitively
//! deduplicated and capped. Every mutation is written through to the
//! backing `KeyValueStore` immediately.

use crate::error::StorageResult;
use crate::storage::{KeyValueStore, RECENT_SEARCHES_KEY};
use std::sync::Arc;

/// Default number of remembered searches
pub const RECENT_MAX: usize = 10;

pub struct RecentSearches {
    entries: Vec<String>,
    capacity: usize,
    store: Arc<dyn KeyValueStore>,
}

impl RecentSearches {
    /// Restore the ledger from `store`. A missing or unreadable entry
    /// starts an empty ledger.
    pub fn load(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let entries = match store.get(RECENT_SEARCHES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Discarding unreadable recent searches: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to load recent searches: {}", e);
                Vec::new()
            }
        };

        let mut ledger = Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            store,
        };
        // Re-apply the invariants in case the stored list was edited by hand
        for entry in entries.into_iter().rev() {
            ledger.insert_front(&entry);
        }
        ledger
    }

    /// Record a committed term. Blank terms are ignored and return
    /// `Ok(false)`; otherwise the ledger is persisted before returning.
    pub fn record(&mut self, term: &str) -> StorageResult<bool> {
        if !self.insert_front(term) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Entries, newest first
    pub fn list(&self) -> &[String] {
        &self.entries
    }

    pub fn clear(&mut self) -> StorageResult<()> {
        self.entries.clear();
        self.store.remove(RECENT_SEARCHES_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert_front(&mut self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        let folded = term.to_lowercase();
        self.entries.retain(|existing| existing.to_lowercase() != folded);
        self.entries.insert(0, term.to_string());
        self.entries.truncate(self.capacity);
        true
    }

    fn persist(&self) -> StorageResult<()> {
        let encoded = serde_json::to_string(&self.entries)?;
        self.store.set(RECENT_SEARCHES_KEY, &encoded)
    }
}
